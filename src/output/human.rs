//! Human-readable output formatting

use crate::admin::charts::{
    daily_progress_chart, discrete_emotion_chart, emotion_type_chart, play_count_chart,
    weekly_users_chart,
};
use crate::admin::SectionView;
use crate::annotate::audio_list::{ItemStyle, ListItem};
use crate::api::admin::{
    AdminList, ConsistencyStats, Overview, SpeakerStats, SystemStatus, UsageClass, UserDetails,
    UserStats, UserTestSetting,
};
use crate::api::ConsistencyReport;
use crate::quiz::TestOutcome;

const CHART_WIDTH: usize = 40;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

/// Format one dashboard section
pub fn format_section(view: &SectionView) -> String {
    match view {
        SectionView::Overview(overview) => format_overview(overview),
        SectionView::Users(users) => format_users(users),
        SectionView::Admins(list) => format_admins(list),
        SectionView::TestSettings(rows) => format_test_settings(rows),
        SectionView::Speakers(speakers) => format_speakers(speakers),
        SectionView::Progress(progress) => {
            let mut output = daily_progress_chart(progress).to_ascii(CHART_WIDTH);
            output.push('\n');
            output.push_str(&weekly_users_chart(progress).to_ascii(CHART_WIDTH));
            output
        }
        SectionView::Quality(quality) => {
            let mut output = String::new();
            for chart in [
                play_count_chart(quality),
                emotion_type_chart(quality),
                discrete_emotion_chart(quality),
            ] {
                output.push_str(&chart.to_ascii(CHART_WIDTH));
                output.push('\n');
            }
            output
        }
        SectionView::Consistency { stats, users } => format_consistency_section(stats, users),
        SectionView::System(status) => format_system(status),
    }
}

fn format_overview(o: &Overview) -> String {
    format!(
        "Overview:\n  Users: {}\n  Audio files: {}\n  Annotations: {}\n  Completion: {:.1}%\n  Today: {}\n  Active users: {}\n",
        o.total_users,
        o.total_audio_files,
        o.total_annotations,
        o.completion_rate,
        o.today_annotations,
        o.active_users
    )
}

fn format_users(users: &[UserStats]) -> String {
    if users.is_empty() {
        return "No annotators yet.\n".to_string();
    }
    let mut output = format!(
        "{:<20} {:>8} {:>9} {:>7} {:>8} {:>9}  {}\n",
        "USER", "TOTAL", "COMPLETED", "RATE", "SPEAKERS", "AVG PLAYS", "LAST"
    );
    for u in users {
        output.push_str(&format!(
            "{:<20} {:>8} {:>9} {:>6.1}% {:>8} {:>9.1}  {}\n",
            u.username,
            u.total_annotations,
            u.completed_annotations,
            u.completion_rate,
            u.speakers_count,
            u.avg_play_count,
            or_dash(&u.last_annotation)
        ));
    }
    output
}

pub fn format_user_details(d: &UserDetails) -> String {
    let mut output = String::new();
    output.push_str(&format!("User {}\n", d.username));
    output.push_str(&format!(
        "  Annotations: {} ({} complete, {:.1}%)\n",
        d.total_annotations, d.completed_annotations, d.completion_rate
    ));
    output.push_str(&format!(
        "  Speakers: {}  Duration: {:.1}s  Avg plays: {:.1}\n",
        d.speakers_count, d.total_duration, d.avg_play_count
    ));

    if !d.speakers_stats.is_empty() {
        output.push_str("\n  Per speaker:\n");
        for s in &d.speakers_stats {
            output.push_str(&format!(
                "    {:<16} {:>5} annotated, {:>5} complete ({:.1}%)\n",
                s.speaker, s.annotations_count, s.completed_count, s.completion_rate
            ));
        }
    }

    if !d.recent_annotations.is_empty() {
        output.push_str("\n  Recent:\n");
        for r in &d.recent_annotations {
            output.push_str(&format!(
                "    {} {}/{}  VA:{} discrete:{}\n",
                or_dash(&r.timestamp),
                r.speaker,
                r.audio_file,
                yes_no(r.va_complete),
                yes_no(r.discrete_complete)
            ));
        }
    }
    output
}

fn format_admins(list: &AdminList) -> String {
    let mut output = String::new();
    if let Some(current) = &list.current_admin {
        output.push_str(&format!(
            "Signed in as {} ({:?})\n\n",
            or_dash(&current.username),
            current.role
        ));
    }
    output.push_str(&format!(
        "{:>4}  {:<16} {:<12} {:<8}  {}\n",
        "ID", "USERNAME", "ROLE", "ACTIVE", "DESCRIPTION"
    ));
    for a in &list.admins {
        let active = if a.is_protected() {
            "-".to_string()
        } else {
            yes_no(a.is_active).to_string()
        };
        output.push_str(&format!(
            "{:>4}  {:<16} {:<12} {:<8}  {}\n",
            a.id,
            a.username,
            format!("{:?}", a.role),
            active,
            or_dash(&a.description)
        ));
    }
    output
}

fn format_test_settings(rows: &[UserTestSetting]) -> String {
    if rows.is_empty() {
        return "No users registered.\n".to_string();
    }
    let mut output = format!(
        "{:<20} {:<12} {:<10} {:<16}  {}\n",
        "USER", "PHONE", "SKIP TEST", "SKIP CONSISTENCY", "CREATED"
    );
    for r in rows {
        output.push_str(&format!(
            "{:<20} {:<12} {:<10} {:<16}  {}\n",
            r.wechat_name,
            r.phone_number,
            yes_no(r.skip_test),
            yes_no(r.skip_consistency_test),
            or_dash(&r.created_at)
        ));
    }
    output
}

fn format_speakers(speakers: &[SpeakerStats]) -> String {
    if speakers.is_empty() {
        return "No speakers found.\n".to_string();
    }
    let mut output = format!(
        "{:<16} {:>6} {:>10} {:>9} {:>7} {:>10} {:>10}\n",
        "SPEAKER", "FILES", "ANNOTATED", "COMPLETED", "RATE", "ANNOTATORS", "DURATION"
    );
    for s in speakers {
        output.push_str(&format!(
            "{:<16} {:>6} {:>10} {:>9} {:>6.1}% {:>10} {:>9.1}s\n",
            s.speaker,
            s.audio_files_count,
            s.total_annotations,
            s.completed_annotations,
            s.completion_rate,
            s.annotators_count,
            s.total_duration
        ));
    }
    output
}

fn format_consistency_section(stats: &ConsistencyStats, users: &[String]) -> String {
    let mut output = format!(
        "Consistency data: {} users, {} samples\n",
        stats.users_count, stats.samples_count
    );
    if users.is_empty() {
        output.push_str("No user has completed the consistency test.\n");
    } else {
        output.push_str("Users with results:\n");
        for user in users {
            output.push_str(&format!("  {}\n", user));
        }
    }
    output
}

fn format_system(status: &SystemStatus) -> String {
    let disk = &status.disk_space;
    let level = match disk.usage_class() {
        UsageClass::Good => "ok",
        UsageClass::Warning => "WARNING",
        UsageClass::Error => "CRITICAL",
    };
    format!(
        "System status:\n  Database: exists={} accessible={} size={:.2}MB records={}\n  Audio folder: exists={} path={}\n  Disk: {:.1}/{:.1}GB used, {:.1}GB free ({:.1}%, {})\n",
        yes_no(status.database.exists),
        yes_no(status.database.accessible),
        status.database.size_mb,
        status.database.total_records,
        yes_no(status.audio_folder.exists),
        status.audio_folder.path,
        disk.used_gb,
        disk.total_gb,
        disk.free_gb,
        disk.usage_percent,
        level
    )
}

/// Summary plus one line per clip, inconsistent dimensions marked
pub fn format_consistency_report(report: &ConsistencyReport) -> String {
    let mut output = String::new();
    let pct = &report.consistency_percentages;
    let scores = &report.consistency_scores;
    output.push_str(&format!(
        "Consistency of {} over {} samples: {:.1}% overall\n",
        report.username, report.total_samples, report.overall_consistency
    ));
    for (name, score, percent) in [
        ("V", scores.v_value, pct.v_value),
        ("A", scores.a_value, pct.a_value),
        ("emotion type", scores.emotion_type, pct.emotion_type),
        ("discrete", scores.discrete_emotion, pct.discrete_emotion),
        ("patient", scores.patient_status, pct.patient_status),
    ] {
        output.push_str(&format!("  {:<13} {:>4} ({:.1}%)\n", name, score, percent));
    }

    if !report.detailed_results.is_empty() {
        output.push('\n');
        for d in &report.detailed_results {
            let mark = if d.fully_consistent() { " " } else { "!" };
            let flags: Vec<&str> = [
                ("V", d.v_consistent),
                ("A", d.a_consistent),
                ("type", d.emotion_type_consistent),
                ("discrete", d.discrete_consistent),
                ("patient", d.patient_consistent),
            ]
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name)
            .collect();
            if flags.is_empty() {
                output.push_str(&format!("{} {}\n", mark, d.audio_file));
            } else {
                output.push_str(&format!("{} {}  differs: {}\n", mark, d.audio_file, flags.join(", ")));
            }
        }
    }
    output
}

/// Clip list; `>` marks the current clip
pub fn format_audio_list(items: &[ListItem<'_>]) -> String {
    if items.is_empty() {
        return "  (no clips)\n".to_string();
    }
    let mut output = String::new();
    for item in items {
        let cursor = if item.active { ">" } else { " " };
        let status = match item.style {
            ItemStyle::Complete => "[VA+D]",
            ItemStyle::VaOnly => "[VA  ]",
            ItemStyle::Default => "[    ]",
        };
        output.push_str(&format!(
            "{} {:>4}. {} {}\n",
            cursor,
            item.index + 1,
            status,
            item.file_name
        ));
    }
    output
}

pub fn format_test_outcome(outcome: &TestOutcome) -> String {
    let verdict = if outcome.passed {
        "Passed! You can start annotating."
    } else {
        "Not passed. Review the annotation rules and try again."
    };
    format!(
        "Correct: {}/{}  Accuracy: {}%\n{}\n",
        outcome.correct, outcome.total, outcome.accuracy, verdict
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::admin::{ConsistencyDetail, DiskSpace};

    #[test]
    fn test_audio_list_marks_current_and_status() {
        let items = vec![
            ListItem {
                index: 0,
                file_name: "a.wav",
                style: ItemStyle::Complete,
                active: false,
            },
            ListItem {
                index: 1,
                file_name: "b.wav",
                style: ItemStyle::VaOnly,
                active: true,
            },
        ];
        let text = format_audio_list(&items);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("[VA+D] a.wav"));
        assert!(lines[1].starts_with('>'));
        assert!(lines[1].contains("[VA  ] b.wav"));
    }

    #[test]
    fn test_system_usage_level() {
        let status = SystemStatus {
            disk_space: DiskSpace {
                usage_percent: 85.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(format_system(&status).contains("WARNING"));
    }

    #[test]
    fn test_report_lists_differing_dimensions() {
        let report = ConsistencyReport {
            username: "alice".to_string(),
            total_samples: 1,
            detailed_results: vec![ConsistencyDetail {
                audio_file: "x.wav".to_string(),
                v_consistent: true,
                a_consistent: false,
                emotion_type_consistent: true,
                discrete_consistent: false,
                patient_consistent: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let text = format_consistency_report(&report);
        assert!(text.contains("! x.wav  differs: A, discrete"));
    }

    #[test]
    fn test_outcome_verdict() {
        let outcome = TestOutcome {
            correct: 9,
            total: 10,
            accuracy: 90,
            passed: true,
        };
        assert!(format_test_outcome(&outcome).contains("Passed"));
    }
}
