use chrono::NaiveDate;

use crate::color_scale::{heat_level, legend_entries};
use crate::date_utils::{CalendarCell, build_month_calendar, month_label, weekday_label};
use crate::model::TaskCounts;
use crate::view::{Action, Element, Node};

/// Maps a clicked day and its task count to the action attached to the cell
pub type DayClick = Box<dyn Fn(NaiveDate, u32) -> Action + Send + Sync>;

/// Yearly calendar colored by task density
///
/// The year is fixed at construction. Counts can be swapped at any time and
/// the next [`Heatmap::render`] rebuilds the whole tree from them.
pub struct Heatmap {
    year: i32,
    counts: TaskCounts,
    on_day_click: Option<DayClick>,
}

impl Heatmap {
    pub fn new(year: i32) -> Self {
        Heatmap {
            year,
            counts: TaskCounts::new(),
            on_day_click: None,
        }
    }

    pub fn set_task_counts(&mut self, counts: TaskCounts) {
        self.counts = counts;
    }

    pub fn task_counts(&self) -> &TaskCounts {
        &self.counts
    }

    pub fn set_on_day_click<F>(&mut self, callback: F)
    where
        F: Fn(NaiveDate, u32) -> Action + Send + Sync + 'static,
    {
        self.on_day_click = Some(Box::new(callback));
    }

    pub fn count_for(&self, cell: &CalendarCell) -> u32 {
        self.counts.get(&cell.iso()).copied().unwrap_or(0)
    }

    /// Full 12-month grid
    pub fn render(&self) -> Node {
        Element::new("div")
            .class("heatmap-grid")
            .children((0..12).map(|month0| self.month_card(month0)))
            .into()
    }

    fn month_card(&self, month0: u32) -> Element {
        let weekdays = Element::new("div")
            .class("dow-row")
            .children((0..7).map(|i| Element::new("div").class("dow-cell").text(weekday_label(i))));

        let grid = Element::new("div").class("calendar-grid").children(
            build_month_calendar(self.year, month0)
                .iter()
                .map(|slot| self.day_cell(slot.as_ref())),
        );

        Element::new("div")
            .class("month-card")
            .child(Element::new("div").class("month-header").text(month_label(month0)))
            .child(weekdays)
            .child(grid)
    }

    fn day_cell(&self, slot: Option<&CalendarCell>) -> Element {
        let Some(cell) = slot else {
            return Element::new("div").class("day-cell").class("empty");
        };

        let count = self.count_for(cell);
        let level = heat_level(count);

        let mut el = Element::new("div")
            .class("day-cell")
            .class(format!("heat-{}", level.index()))
            .attr("data-iso", cell.iso())
            .style("background-color", level.background_color())
            .style("color", level.text_color())
            .child(Element::new("div").class("day-number").text(cell.day.to_string()));

        if count > 0 {
            el = el
                .class("has-tasks")
                .attr("title", format!("{} tasks", count))
                .child(Element::new("div").class("task-count").text(count.to_string()));

            if let Some(callback) = &self.on_day_click {
                el = el.class("clickable").on_click(callback(cell.date, count));
            }
        }

        el
    }
}

/// Legend strip explaining the color steps
pub fn legend() -> Node {
    Element::new("div")
        .class("heatmap-legend")
        .children(legend_entries().into_iter().map(|entry| {
            Element::new("div")
                .class("legend-item")
                .child(
                    Element::new("span")
                        .class("legend-swatch")
                        .style("background-color", entry.color),
                )
                .child(
                    Element::new("span")
                        .class("legend-label")
                        .text(format!("{} ({})", entry.label, entry.range)),
                )
        }))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_utils::{days_in_month, first_weekday_of_month};

    fn open_day(date: NaiveDate, count: u32) -> Action {
        Action::OpenDay { date, count }
    }

    fn january(tree: &Node) -> &Element {
        tree.find_all_by_class("month-card")[0]
    }

    #[test]
    fn renders_twelve_months_with_weekday_headers() {
        let heatmap = Heatmap::new(2026);
        let tree = heatmap.render();

        let months = tree.find_all_by_class("month-card");
        assert_eq!(months.len(), 12);
        let headers: Vec<String> = tree
            .find_all_by_class("month-header")
            .iter()
            .map(|h| Node::Element((*h).clone()).text_content())
            .collect();
        assert_eq!(headers[0], "January");
        assert_eq!(headers[11], "December");
        assert_eq!(tree.find_all_by_class("dow-cell").len(), 12 * 7);
    }

    #[test]
    fn single_busy_day_gets_level_three_and_a_badge() {
        let mut heatmap = Heatmap::new(2026);
        heatmap.set_task_counts(TaskCounts::from([("2026-01-10".to_string(), 6)]));
        heatmap.set_on_day_click(open_day);

        let tree = heatmap.render();
        let jan = Node::Element(january(&tree).clone());

        let days = jan.find_all_by_class("day-cell");
        let padding = first_weekday_of_month(2026, 0) as usize;
        assert_eq!(days.len(), padding + days_in_month(2026, 0) as usize);

        for day in days.iter().filter(|d| !d.has_class("empty")) {
            let node = Node::Element((*day).clone());
            if day.attr_value("data-iso") == Some("2026-01-10") {
                assert!(day.has_class("heat-3"));
                let badge = node
                    .find_by_class("task-count")
                    .map(|b| Node::Element(b.clone()).text_content());
                assert_eq!(badge, Some("6".into()));
                assert_eq!(
                    day.action,
                    Some(open_day(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(), 6))
                );
            } else {
                assert!(day.has_class("heat-0"));
                assert!(node.find_by_class("task-count").is_none());
                assert!(day.action.is_none());
            }
        }
    }

    #[test]
    fn empty_cells_are_inert_placeholders() {
        let mut heatmap = Heatmap::new(2026);
        heatmap.set_on_day_click(open_day);
        let tree = heatmap.render();

        let empties = tree.find_all_by_class("empty");
        let expected: usize = (0..12).map(|m| first_weekday_of_month(2026, m) as usize).sum();
        assert_eq!(empties.len(), expected);
        assert!(empties.iter().all(|e| e.action.is_none() && e.children.is_empty()));
    }

    #[test]
    fn no_callback_means_no_click_affordance() {
        let mut heatmap = Heatmap::new(2026);
        heatmap.set_task_counts(TaskCounts::from([("2026-05-01".to_string(), 2)]));
        let tree = heatmap.render();

        let day = tree.find_by_class("has-tasks").unwrap();
        assert!(day.action.is_none());
        assert!(!day.has_class("clickable"));
    }

    #[test]
    fn rerender_reflects_new_counts_only() {
        let mut heatmap = Heatmap::new(2026);
        heatmap.set_task_counts(TaskCounts::from([("2026-02-02".to_string(), 9)]));
        assert_eq!(heatmap.render().find_all_by_class("has-tasks").len(), 1);

        heatmap.set_task_counts(TaskCounts::new());
        assert!(heatmap.render().find_all_by_class("has-tasks").is_empty());
    }

    #[test]
    fn legend_lists_five_steps() {
        assert_eq!(legend().find_all_by_class("legend-item").len(), 5);
    }
}
