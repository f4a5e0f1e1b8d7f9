use tracker_core::{AppViewModel, BadgeTone, ProgressView, SessionState, TaskView, UnitMark};

const BAR_WIDTH: usize = 20;
/// Log lines shown per task. The view model carries the full log.
const LOG_LINES: usize = 5;

pub fn render(view: &AppViewModel) -> Vec<String> {
    let session_label = match view.session {
        SessionState::Active => "Active",
        SessionState::LoggedOut => "Logged out",
    };

    let mut lines = vec![format!(
        "Session: {} | Tasks: {}",
        session_label,
        view.tabs.len()
    )];

    if let Some(error) = &view.last_poll_error {
        lines.push(format!("Last poll failed: {error} (showing last known state)"));
    }

    if !view.tabs.is_empty() {
        let tabs = view
            .tabs
            .iter()
            .map(|tab| format!("[{}] {}", tab.task_id, tab.label))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(tabs);
    }

    for task in &view.tasks {
        lines.extend(render_task(task));
    }

    if let Some(notice) = &view.notice {
        lines.push(format!("* {notice}"));
    }

    lines
}

fn render_task(task: &TaskView) -> Vec<String> {
    let progress = &task.progress;
    let mut lines = vec![format!(
        "#{} {} [{}] {:>3}% {}  {}",
        task.task_id,
        progress.headline,
        badge_label(progress.badge),
        progress.percent,
        bar(progress.percent),
        progress.phase_caption
    )];

    let counters = progress.counters;
    lines.push(format!(
        "    new {} | duplicates {} | skipped {} | errors {}",
        counters.new_count, counters.duplicate_count, counters.skipped_count, counters.error_count
    ));

    for row in &progress.plan_rows {
        let mark = match row.mark {
            UnitMark::Done => "x",
            UnitMark::Current => ">",
            UnitMark::Pending => " ",
        };
        lines.push(format!("    [{mark}] {}: {}", row.kind, row.value));
    }

    lines.extend(log_lines(progress));

    let mut actions = Vec::new();
    if progress.can_stop {
        actions.push(format!("stop {}", task.task_id));
    }
    if progress.can_dismiss {
        actions.push(format!("dismiss {}", task.task_id));
    }
    if !actions.is_empty() {
        lines.push(format!("    actions: {}", actions.join(", ")));
    }

    lines
}

fn log_lines(progress: &ProgressView) -> Vec<String> {
    let skip = progress.log_tail.len().saturating_sub(LOG_LINES);
    progress
        .log_tail
        .iter()
        .skip(skip)
        .map(|entry| match entry.timestamp {
            Some(time) => format!("    {} {}", time.format("%H:%M:%S"), entry.message),
            None => format!("    -------- {}", entry.message),
        })
        .collect()
}

fn badge_label(tone: BadgeTone) -> &'static str {
    match tone {
        BadgeTone::Neutral => "neutral",
        BadgeTone::Info => "info",
        BadgeTone::Warning => "warning",
        BadgeTone::Success => "success",
        BadgeTone::Danger => "danger",
    }
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
