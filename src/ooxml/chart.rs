//! Chart part (`word/charts/chartN.xml`) reader.

use super::cursor::{Ns, XmlCursor, XmlNode};
use crate::error::Result;
use crate::model::{ChartInfo, ChartType, DataSeries};

/// Pull title, plot family and series out of a DrawingML chart part.
///
/// Only the first plot of the plot area decides the chart type. Series
/// labels come from `c:tx`, values from the cached `c:val` (or `c:yVal`)
/// points; non-numeric cache entries are dropped.
pub fn parse_chart_part(data: &[u8]) -> Result<ChartInfo> {
    let mut cursor = XmlCursor::new(data);
    let mut chart = ChartInfo::default();
    let mut path: Vec<(Ns, String)> = Vec::new();
    let mut series: Option<DataSeries> = None;
    let mut plot_seen = false;

    loop {
        match cursor.next_node()? {
            XmlNode::Start(e) => {
                if e.ns == Ns::C {
                    if !plot_seen && parent_is(&path, "plotArea") {
                        if let Some(kind) = ChartType::from_plot_name(&e.name) {
                            chart.chart_type = kind;
                            plot_seen = true;
                            chart.properties.insert("plot".into(), e.name.clone());
                        }
                    }
                    if e.name == "ser" {
                        series = Some(DataSeries::default());
                    }
                }
                path.push((e.ns, e.name));
            }
            XmlNode::End { ns, name } => {
                path.pop();
                if ns == Ns::C && name == "ser" {
                    if let Some(s) = series.take() {
                        chart.data_series.push(s);
                    }
                }
            }
            XmlNode::Text(text) => {
                let Some((ns, leaf)) = path.last() else {
                    continue;
                };
                if in_chart_title(&path) && (*ns == Ns::A && leaf == "t" || *ns == Ns::C && leaf == "v") {
                    chart.title.push_str(&text);
                } else if *ns == Ns::C && leaf == "v" {
                    if let Some(s) = series.as_mut() {
                        if within(&path, "tx") {
                            s.label.push_str(text.trim());
                        } else if within(&path, "val") || within(&path, "yVal") {
                            if let Ok(v) = text.trim().parse::<f64>() {
                                s.values.push(v);
                            }
                        }
                    }
                }
            }
            XmlNode::Eof => break,
        }
    }

    chart.title = chart.title.trim().to_string();
    Ok(chart)
}

fn parent_is(path: &[(Ns, String)], name: &str) -> bool {
    path.last()
        .is_some_and(|(ns, n)| *ns == Ns::C && n == name)
}

fn within(path: &[(Ns, String)], name: &str) -> bool {
    path.iter().any(|(ns, n)| *ns == Ns::C && n == name)
}

/// The chart's own title is `c:chart/c:title`; axis titles live deeper.
fn in_chart_title(path: &[(Ns, String)]) -> bool {
    path.windows(2).any(|w| {
        w[0].0 == Ns::C && w[0].1 == "chart" && w[1].0 == Ns::C && w[1].1 == "title"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"
              xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <c:chart>
    <c:title><c:tx><c:rich><a:p><a:r><a:t>Quarterly </a:t></a:r><a:r><a:t>Sales</a:t></a:r></a:p></c:rich></c:tx></c:title>
    <c:plotArea>
      <c:layout/>
      <c:barChart>
        <c:barDir val="col"/>
        <c:ser>
          <c:idx val="0"/>
          <c:tx><c:strRef><c:f>Sheet1!$B$1</c:f><c:strCache><c:pt idx="0"><c:v>North</c:v></c:pt></c:strCache></c:strRef></c:tx>
          <c:cat><c:strRef><c:strCache><c:pt idx="0"><c:v>Q1</c:v></c:pt></c:strCache></c:strRef></c:cat>
          <c:val><c:numRef><c:numCache><c:pt idx="0"><c:v>4.3</c:v></c:pt><c:pt idx="1"><c:v>2.5</c:v></c:pt></c:numCache></c:numRef></c:val>
        </c:ser>
        <c:ser>
          <c:tx><c:v>South</c:v></c:tx>
          <c:val><c:numLit><c:pt idx="0"><c:v>1</c:v></c:pt><c:pt idx="1"><c:v>n/a</c:v></c:pt></c:numLit></c:val>
        </c:ser>
      </c:barChart>
      <c:lineChart/>
      <c:valAx><c:title><c:tx><c:rich><a:p><a:r><a:t>Units</a:t></a:r></a:p></c:rich></c:tx></c:title></c:valAx>
    </c:plotArea>
  </c:chart>
</c:chartSpace>"#;

    #[test]
    fn test_parse_bar_chart() {
        let chart = parse_chart_part(CHART.as_bytes()).unwrap();
        assert_eq!(chart.title, "Quarterly Sales");
        assert_eq!(chart.chart_type, ChartType::Bar);
        assert_eq!(chart.data_series.len(), 2);
        assert_eq!(chart.data_series[0].label, "North");
        assert_eq!(chart.data_series[0].values, vec![4.3, 2.5]);
        assert_eq!(chart.data_series[1].label, "South");
        assert_eq!(chart.data_series[1].values, vec![1.0]);
        assert_eq!(chart.properties.get("plot").map(String::as_str), Some("barChart"));
    }

    #[test]
    fn test_untitled_pie() {
        let xml = br#"<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart><c:plotArea><c:doughnutChart/></c:plotArea></c:chart></c:chartSpace>"#;
        let chart = parse_chart_part(xml).unwrap();
        assert_eq!(chart.chart_type, ChartType::Pie);
        assert!(chart.title.is_empty());
        assert!(chart.data_series.is_empty());
    }

    #[test]
    fn test_malformed_chart() {
        assert!(parse_chart_part(b"<c:chartSpace><c:chart>").is_err());
    }
}
