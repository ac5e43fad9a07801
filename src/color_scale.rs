use serde::Serialize;

/// Background colors, one per heat level
pub const BACKGROUND_COLORS: [&str; 5] = ["#f0f0f0", "#b3e5fc", "#fff176", "#ffb74d", "#e57373"];

/// Text colors picked for contrast against [`BACKGROUND_COLORS`]
pub const TEXT_COLORS: [&str; 5] = ["#666666", "#1976d2", "#f57f17", "#e65100", "#c62828"];

/// Discrete task density bucket of a calendar day
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HeatLevel {
    /// No tasks
    Empty,
    /// 1-2 tasks
    Light,
    /// 3-4 tasks
    Moderate,
    /// 5-7 tasks
    Busy,
    /// 8 or more tasks
    Overloaded,
}

impl HeatLevel {
    pub const ALL: [HeatLevel; 5] = [
        HeatLevel::Empty,
        HeatLevel::Light,
        HeatLevel::Moderate,
        HeatLevel::Busy,
        HeatLevel::Overloaded,
    ];

    /// Bucket a task count
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => HeatLevel::Empty,
            1..=2 => HeatLevel::Light,
            3..=4 => HeatLevel::Moderate,
            5..=7 => HeatLevel::Busy,
            _ => HeatLevel::Overloaded,
        }
    }

    /// Numeric level, 0..=4
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn background_color(self) -> &'static str {
        BACKGROUND_COLORS[self.index()]
    }

    pub fn text_color(self) -> &'static str {
        TEXT_COLORS[self.index()]
    }

    pub fn label(self) -> &'static str {
        match self {
            HeatLevel::Empty => "No tasks",
            HeatLevel::Light => "Light",
            HeatLevel::Moderate => "Moderate",
            HeatLevel::Busy => "Busy",
            HeatLevel::Overloaded => "Overloaded",
        }
    }

    /// Human readable count range of the bucket
    pub fn range_text(self) -> &'static str {
        match self {
            HeatLevel::Empty => "0",
            HeatLevel::Light => "1-2",
            HeatLevel::Moderate => "3-4",
            HeatLevel::Busy => "5-7",
            HeatLevel::Overloaded => "8+",
        }
    }
}

/// One row of the heatmap legend
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub level: usize,
    pub color: &'static str,
    pub label: &'static str,
    pub range: &'static str,
}

pub fn heat_level(count: u32) -> HeatLevel {
    HeatLevel::from_count(count)
}

pub fn background_color(count: u32) -> &'static str {
    heat_level(count).background_color()
}

pub fn text_color(count: u32) -> &'static str {
    heat_level(count).text_color()
}

/// Legend rows in ascending level order
pub fn legend_entries() -> Vec<LegendEntry> {
    HeatLevel::ALL
        .iter()
        .map(|level| LegendEntry {
            level: level.index(),
            color: level.background_color(),
            label: level.label(),
            range: level.range_text(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        let expected = [
            (0, 0),
            (1, 1),
            (2, 1),
            (3, 2),
            (4, 2),
            (5, 3),
            (7, 3),
            (8, 4),
            (500, 4),
        ];
        for (count, level) in expected {
            assert_eq!(heat_level(count).index(), level, "count {}", count);
        }
    }

    #[test]
    fn level_is_monotonic_and_bounded() {
        let mut previous = heat_level(0);
        for count in 0..200 {
            let level = heat_level(count);
            assert!(level >= previous);
            assert!(level.index() <= 4);
            previous = level;
        }
    }

    #[test]
    fn colors_follow_the_level() {
        assert_eq!(background_color(0), BACKGROUND_COLORS[0]);
        assert_eq!(background_color(6), BACKGROUND_COLORS[3]);
        assert_eq!(text_color(9), TEXT_COLORS[4]);
    }

    #[test]
    fn legend_is_ascending_and_complete() {
        let legend = legend_entries();
        assert_eq!(legend.len(), 5);
        for (i, entry) in legend.iter().enumerate() {
            assert_eq!(entry.level, i);
            assert_eq!(entry.color, BACKGROUND_COLORS[i]);
        }
        assert_eq!(legend[4].range, "8+");
    }
}
