//! Worksheet summaries
//!
//! Produces the plain-text chart description handed to the classification
//! oracle: for each worksheet behind a published view, its title, the
//! fields on each axis and the filters applied, all translated to captions
//! and cleaned of vendor qualifiers.

use std::fmt;

use serde::Serialize;

use super::document::XmlElement;
use super::knowledge::IdTranslationTable;
use crate::normalize::{clean_field_name, NO_FIELD};

const MAX_FILTERS: usize = 5;
const EXCLUDED_FILTER_MARKERS: &[&str] = &["Action", "Measure Names"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSummary {
    pub sheet_name: String,
    pub title: String,
    pub y_axis: String,
    pub x_axis: String,
    pub filters: Vec<String>,
}

impl fmt::Display for ChartSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\n=== Chart: {} ===\nTitle: {}\nY-Axis: {}\nX-Axis: {}\nFilters: {}\n",
            self.sheet_name,
            self.title,
            self.y_axis,
            self.x_axis,
            self.filters.join(", ")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorksheetSummary {
    pub charts: Vec<ChartSummary>,
}

impl WorksheetSummary {
    pub fn render(&self) -> String {
        if self.charts.is_empty() {
            return "No matching charts found.".to_string();
        }
        self.charts
            .iter()
            .map(ChartSummary::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Caption translation for every column anywhere in the workbook.
///
/// Unlike the knowledge-base aliases, uncaptioned columns map to their
/// bracket-stripped identifier and bracketed ids map to bare captions.
pub fn field_map(root: &XmlElement) -> IdTranslationTable {
    let mut pairs = Vec::new();
    for column in root.descendants("column") {
        let Some(name) = column.attr_non_empty("name") else {
            continue;
        };
        let clean_id = name.replace(['[', ']'], "");
        let display = column
            .attr_non_empty("caption")
            .map(str::to_string)
            .unwrap_or_else(|| clean_id.clone());
        pairs.push((name.to_string(), display.clone()));
        pairs.push((clean_id, display));
    }
    IdTranslationTable::from_pairs(pairs)
}

/// Translate identifiers to captions, then clean vendor qualifiers.
pub fn clean_shelf_text(text: &str, map: &IdTranslationTable) -> String {
    if text.is_empty() || text == NO_FIELD {
        return NO_FIELD.to_string();
    }
    clean_field_name(&map.translate(text))
}

fn squash(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Worksheets behind `target_view`.
///
/// Matches worksheet names first; when none match, takes the worksheets
/// placed on the first dashboard whose name matches.
pub fn find_target_worksheets<'a>(root: &'a XmlElement, target_view: &str) -> Vec<&'a XmlElement> {
    let target = squash(target_view);
    if target.is_empty() {
        return Vec::new();
    }

    let worksheets = root.descendants("worksheet");
    let direct: Vec<&XmlElement> = worksheets
        .iter()
        .copied()
        .filter(|ws| squash(ws.attr("name").unwrap_or("")).contains(&target))
        .collect();
    if !direct.is_empty() {
        return direct;
    }

    let Some(dashboard) = root
        .descendants("dashboard")
        .into_iter()
        .find(|d| squash(d.attr("name").unwrap_or("")).contains(&target))
    else {
        return Vec::new();
    };

    let mut targets = Vec::new();
    for zone in dashboard.descendants("zone") {
        let Some(zone_name) = zone.attr("name") else {
            continue;
        };
        targets.extend(
            worksheets
                .iter()
                .copied()
                .filter(|ws| ws.attr("name") == Some(zone_name)),
        );
    }
    targets
}

fn summarize_worksheet(ws: &XmlElement, map: &IdTranslationTable) -> ChartSummary {
    let title = ws
        .find_descendant("title")
        .and_then(|t| t.find_descendant("run"))
        .map(XmlElement::own_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());

    let shelf = |name: &str| -> String {
        ws.child("table")
            .and_then(|table| table.child(name))
            .map(|node| clean_shelf_text(node.text().trim(), map))
            .unwrap_or_else(|| NO_FIELD.to_string())
    };

    let mut filters: Vec<String> = Vec::new();
    for filter in ws.descendants("filter") {
        let Some(column) = filter.attr_non_empty("column") else {
            continue;
        };
        let cleaned = clean_shelf_text(column, map);
        if EXCLUDED_FILTER_MARKERS.iter().any(|m| cleaned.contains(m)) {
            continue;
        }
        if !filters.contains(&cleaned) {
            filters.push(cleaned);
        }
    }
    filters.truncate(MAX_FILTERS);

    ChartSummary {
        sheet_name: ws.attr("name").unwrap_or("").to_string(),
        title,
        y_axis: shelf("rows"),
        x_axis: shelf("cols"),
        filters,
    }
}

/// Summarize every distinct worksheet behind `target_view`.
pub fn summarize(root: &XmlElement, target_view: &str) -> WorksheetSummary {
    let map = field_map(root);
    let mut seen: Vec<&str> = Vec::new();
    let mut charts = Vec::new();

    for ws in find_target_worksheets(root, target_view) {
        let name = ws.attr("name").unwrap_or("");
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        charts.push(summarize_worksheet(ws, &map));
    }

    tracing::debug!(view = target_view, charts = charts.len(), "summarized worksheets");
    WorksheetSummary { charts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::document::WorkbookDocument;

    const WORKBOOK: &str = r#"<?xml version='1.0' encoding='utf-8' ?>
<workbook>
  <datasources>
    <datasource name='federated.1'>
      <column caption='Capacity' datatype='real' name='[Capacity]' role='measure' />
      <column caption='Install Rank' datatype='integer' name='[Calculation_7]' role='measure'>
        <calculation class='tableau' formula='INDEX()' />
      </column>
      <column datatype='string' name='[Region]' role='dimension' />
    </datasource>
  </datasources>
  <worksheets>
    <worksheet name='Installs By Region'>
      <layout-options><title><formatted-text><run>Installs by region</run></formatted-text></title></layout-options>
      <table>
        <view>
          <filter class='categorical' column='[federated.1].[none:Region:nk]' />
          <filter class='categorical' column='[federated.1].[Action (Region)]' />
          <filter class='categorical' column='[federated.1].[none:Region:nk]' />
        </view>
        <rows>([federated.1].[usr:Calculation_7:qk] * [federated.1].[sum:Capacity:qk])</rows>
        <cols>[federated.1].[none:Region:nk]</cols>
      </table>
    </worksheet>
    <worksheet name='Map'>
      <table><view /><rows /><cols /></table>
    </worksheet>
  </worksheets>
  <dashboards>
    <dashboard name='Market Overview'>
      <zones>
        <zone name='Map' />
        <zone name='Installs By Region' />
        <zone name='Map' />
      </zones>
    </dashboard>
  </dashboards>
</workbook>
"#;

    #[test]
    fn test_summary_for_worksheet() {
        let doc = WorkbookDocument::parse(WORKBOOK).unwrap();
        let summary = summarize(&doc.root, "installs by region");
        assert_eq!(summary.charts.len(), 1);

        let chart = &summary.charts[0];
        assert_eq!(chart.title, "Installs by region");
        assert_eq!(chart.y_axis, "Install Rank, Capacity");
        assert_eq!(chart.x_axis, "Region");
        assert_eq!(chart.filters, vec!["Region".to_string()]);
        assert!(summary
            .render()
            .contains("=== Chart: Installs By Region ===\nTitle: Installs by region\n"));
    }

    #[test]
    fn test_dashboard_fallback_dedupes_sheets() {
        let doc = WorkbookDocument::parse(WORKBOOK).unwrap();
        let summary = summarize(&doc.root, "Market Overview");
        let names: Vec<&str> = summary.charts.iter().map(|c| c.sheet_name.as_str()).collect();
        assert_eq!(names, vec!["Map", "Installs By Region"]);

        let map = &summary.charts[0];
        assert_eq!(map.title, "No Title");
        assert_eq!(map.y_axis, NO_FIELD);
    }

    #[test]
    fn test_no_match() {
        let doc = WorkbookDocument::parse(WORKBOOK).unwrap();
        assert_eq!(summarize(&doc.root, "Nothing").render(), "No matching charts found.");
        assert_eq!(summarize(&doc.root, "").render(), "No matching charts found.");
    }
}
