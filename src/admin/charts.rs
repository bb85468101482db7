//! Dashboard charts
//!
//! Each chart lives in a named slot. Rendering into a slot destroys the
//! previous instance first, so reloading a section never stacks charts.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::api::admin::{Progress, Quality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartSlot {
    DailyProgress,
    WeeklyUsers,
    PlayCount,
    EmotionType,
    DiscreteEmotion,
}

impl ChartSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartSlot::DailyProgress => "daily_progress",
            ChartSlot::WeeklyUsers => "weekly_users",
            ChartSlot::PlayCount => "play_count",
            ChartSlot::EmotionType => "emotion_type",
            ChartSlot::DiscreteEmotion => "discrete_emotion",
        }
    }
}

impl fmt::Display for ChartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl Chart {
    fn single(title: &str, kind: ChartKind, rows: impl Iterator<Item = (String, f64)>) -> Self {
        let (labels, values): (Vec<_>, Vec<_>) = rows.unzip();
        Chart {
            title: title.to_string(),
            kind,
            labels,
            datasets: vec![Dataset {
                label: "count".to_string(),
                values,
            }],
        }
    }

    /// Horizontal bars, one line per label and dataset
    pub fn to_ascii(&self, width: usize) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.title));

        let max = self
            .datasets
            .iter()
            .flat_map(|d| d.values.iter().copied())
            .fold(0.0_f64, f64::max);
        let total: f64 = self.datasets.first().map_or(0.0, |d| d.values.iter().sum());
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let multi = self.datasets.len() > 1;

        if self.labels.is_empty() {
            out.push_str("  (no data)\n");
            return out;
        }

        for (i, label) in self.labels.iter().enumerate() {
            for dataset in &self.datasets {
                let value = dataset.values.get(i).copied().unwrap_or(0.0);
                let bar = if max > 0.0 {
                    ((value / max) * width as f64).round() as usize
                } else {
                    0
                };
                let name = if multi {
                    format!("{:<w$} {}", label, dataset.label, w = label_width)
                } else {
                    format!("{:<w$}", label, w = label_width)
                };
                let share = match self.kind {
                    ChartKind::Pie | ChartKind::Doughnut if total > 0.0 => {
                        format!(" ({:.1}%)", value / total * 100.0)
                    }
                    _ => String::new(),
                };
                out.push_str(&format!("  {} |{} {}{}\n", name, "#".repeat(bar), value, share));
            }
        }
        out
    }
}

pub fn daily_progress_chart(progress: &Progress) -> Chart {
    let rows = &progress.daily_progress;
    Chart {
        title: "Daily annotation progress".to_string(),
        kind: ChartKind::Line,
        labels: rows.iter().map(|r| r.date.clone()).collect(),
        datasets: vec![
            Dataset {
                label: "annotations".to_string(),
                values: rows.iter().map(|r| r.annotations as f64).collect(),
            },
            Dataset {
                label: "completed".to_string(),
                values: rows.iter().map(|r| r.completed as f64).collect(),
            },
        ],
    }
}

pub fn weekly_users_chart(progress: &Progress) -> Chart {
    let rows = &progress.weekly_user_progress;
    Chart {
        title: "Annotations per user this week".to_string(),
        kind: ChartKind::Bar,
        labels: rows.iter().map(|r| r.username.clone()).collect(),
        datasets: vec![
            Dataset {
                label: "annotations".to_string(),
                values: rows.iter().map(|r| r.annotations as f64).collect(),
            },
            Dataset {
                label: "completed".to_string(),
                values: rows.iter().map(|r| r.completed as f64).collect(),
            },
        ],
    }
}

pub fn play_count_chart(quality: &Quality) -> Chart {
    Chart::single(
        "Play count distribution",
        ChartKind::Doughnut,
        quality
            .play_count_distribution
            .iter()
            .map(|b| (b.range.clone(), b.count as f64)),
    )
}

pub fn emotion_type_chart(quality: &Quality) -> Chart {
    Chart::single(
        "Emotion type distribution",
        ChartKind::Pie,
        quality
            .emotion_type_distribution
            .iter()
            .map(|t| (t.emotion_type.clone(), t.count as f64)),
    )
}

pub fn discrete_emotion_chart(quality: &Quality) -> Chart {
    Chart::single(
        "Discrete emotion distribution",
        ChartKind::Bar,
        quality
            .discrete_emotion_distribution
            .iter()
            .map(|e| (e.emotion.clone(), e.count as f64)),
    )
}

/// A chart currently on screen
#[derive(Debug, Clone)]
pub struct ChartInstance {
    pub id: u64,
    pub chart: Chart,
}

#[derive(Debug, Default)]
pub struct ChartRegistry {
    slots: HashMap<ChartSlot, ChartInstance>,
    next_id: u64,
    destroyed: u64,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy whatever occupies `slot`, then show `chart` there
    pub fn render(&mut self, slot: ChartSlot, chart: Chart) -> &ChartInstance {
        self.destroy(slot);
        self.next_id += 1;
        let id = self.next_id;
        debug!(%slot, id, "chart created");
        self.slots.entry(slot).or_insert(ChartInstance { id, chart })
    }

    pub fn destroy(&mut self, slot: ChartSlot) -> bool {
        match self.slots.remove(&slot) {
            Some(old) => {
                debug!(%slot, id = old.id, "chart destroyed");
                self.destroyed += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: ChartSlot) -> Option<&ChartInstance> {
        self.slots.get(&slot)
    }

    /// Live instances
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }

    pub fn render_progress(&mut self, progress: &Progress) {
        self.render(ChartSlot::DailyProgress, daily_progress_chart(progress));
        self.render(ChartSlot::WeeklyUsers, weekly_users_chart(progress));
    }

    pub fn render_quality(&mut self, quality: &Quality) {
        self.render(ChartSlot::PlayCount, play_count_chart(quality));
        self.render(ChartSlot::EmotionType, emotion_type_chart(quality));
        self.render(ChartSlot::DiscreteEmotion, discrete_emotion_chart(quality));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::admin::{DailyProgress, EmotionTypeCount, PlayCountBucket};

    fn progress() -> Progress {
        Progress {
            daily_progress: vec![
                DailyProgress {
                    date: "2024-05-01".to_string(),
                    annotations: 10,
                    completed: 4,
                },
                DailyProgress {
                    date: "2024-05-02".to_string(),
                    annotations: 20,
                    completed: 20,
                },
            ],
            weekly_user_progress: Vec::new(),
        }
    }

    #[test]
    fn test_rerender_replaces_instance() {
        let mut registry = ChartRegistry::new();
        registry.render_progress(&progress());
        let first = registry.get(ChartSlot::DailyProgress).unwrap().id;

        registry.render_progress(&progress());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.destroyed_count(), 2);
        assert_ne!(registry.get(ChartSlot::DailyProgress).unwrap().id, first);
    }

    #[test]
    fn test_daily_chart_has_two_series() {
        let chart = daily_progress_chart(&progress());
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.datasets.len(), 2);
        assert_eq!(chart.datasets[1].values, vec![4.0, 20.0]);
    }

    #[test]
    fn test_ascii_scales_to_max() {
        let chart = daily_progress_chart(&progress());
        let text = chart.to_ascii(10);
        assert!(text.contains(&format!("|{} 20", "#".repeat(10))));
        assert!(text.contains(&format!("|{} 10", "#".repeat(5))));
    }

    #[test]
    fn test_pie_shows_shares() {
        let quality = Quality {
            emotion_type_distribution: vec![
                EmotionTypeCount {
                    emotion_type: "neutral".to_string(),
                    count: 1,
                },
                EmotionTypeCount {
                    emotion_type: "non-neutral".to_string(),
                    count: 3,
                },
            ],
            play_count_distribution: vec![PlayCountBucket {
                range: "1-2".to_string(),
                count: 0,
            }],
            ..Default::default()
        };
        let text = emotion_type_chart(&quality).to_ascii(8);
        assert!(text.contains("(75.0%)"));
        // all-zero data still renders
        assert!(play_count_chart(&quality).to_ascii(8).contains("1-2"));
    }

    #[test]
    fn test_empty_chart() {
        let text = weekly_users_chart(&progress()).to_ascii(10);
        assert!(text.contains("(no data)"));
    }
}
