//! Integration tests for exporting and summarizing regression results.

use bilbao_data::{FactorRow, FactorTable};
use bilbao_output::{
    ExportFormat, Exporter, PanelDiagnostics, RegressionSummary, ReportBuilder, capm_rows,
    three_factor_rows,
};
use bilbao_regression::{CapmModel, FactorInputs, FactorModel, ThreeFactorModel};
use bilbao_returns::{MergedPanel, ReturnSeries};
use chrono::NaiveDate;

fn month(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021 + (i / 12) as i32, i % 12 + 1, 1).unwrap()
}

fn panel() -> MergedPanel {
    let n = 24;
    let index: Vec<f64> = (0..n)
        .map(|i| ((i * 7 % 11) as f64 - 5.0) / 100.0)
        .collect();
    let factors: FactorTable = (0..n)
        .map(|i| {
            let smb = ((i * 3 % 5) as f64 - 2.0) / 500.0;
            let hml = ((i * 5 % 7) as f64 - 3.0) / 400.0;
            (month(i), FactorRow::new(index[i as usize], smb, hml, 0.001))
        })
        .collect();

    let bkt = ReturnSeries::from_points(
        "BKT.MC",
        (0..n).map(|i| (month(i), 1.2 * index[i as usize] + 0.001 + 0.0002 * (i % 4) as f64)),
    );
    let eng = ReturnSeries::from_points(
        "ENG.MC",
        (0..n).map(|i| (month(i), 0.6 * index[i as usize] - 0.0003 * (i % 3) as f64)),
    );
    let ana = ReturnSeries::new("ANA.MC");
    let ibex = ReturnSeries::from_points("^IBEX", (0..n).map(|i| (month(i), index[i as usize])));

    MergedPanel::merge(&[bkt, ana, eng], &ibex, &factors)
}

#[test]
fn test_full_export_workflow() {
    let panel = panel();
    assert_eq!(panel.len(), 24);

    let excess = panel.excess_returns();
    assert_eq!(excess.valid_stocks(), vec!["BKT.MC", "ENG.MC"]);

    let inputs = FactorInputs::new(excess.market(), excess.smb(), excess.hml());
    let capm = CapmModel.fit_all(excess.iter(), &inputs).unwrap();
    let ff3 = ThreeFactorModel.fit_all(excess.iter(), &inputs).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let capm_path = dir.path().join("CAPM_results_244604.csv");
    let ff3_path = dir.path().join("FF3_results_244604.csv");
    let panel_path = dir.path().join("merged_panel_244604.csv");

    capm_rows(&capm)
        .export_to_file(&capm_path, ExportFormat::Csv)
        .unwrap();
    three_factor_rows(&ff3)
        .export_to_file(&ff3_path, ExportFormat::Csv)
        .unwrap();
    panel.export_to_file(&panel_path, ExportFormat::Csv).unwrap();

    let capm_csv = std::fs::read_to_string(&capm_path).unwrap();
    let lines: Vec<&str> = capm_csv.lines().collect();
    assert_eq!(lines[0], "Stock,Alpha,Beta_IBEX,Alpha_t,Beta_t,R2");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("BKT.MC,"));
    assert!(lines[2].starts_with("ENG.MC,"));

    let ff3_csv = std::fs::read_to_string(&ff3_path).unwrap();
    assert!(ff3_csv.starts_with("Stock,Alpha,Beta_IBEX,SMB_coef,HML_coef,R2"));
    assert!(!ff3_csv.contains("ANA.MC"));

    let panel_csv = std::fs::read_to_string(&panel_path).unwrap();
    assert!(panel_csv.starts_with("Date,BKT.MC,ENG.MC,^IBEX,Mkt-RF,SMB,HML,RF"));
    assert_eq!(panel_csv.lines().count(), 25);
}

#[test]
fn test_summaries_and_report() {
    let panel = panel();
    let excess = panel.excess_returns();
    let inputs = FactorInputs::new(excess.market(), excess.smb(), excess.hml());
    let capm = CapmModel.fit_all(excess.iter(), &inputs).unwrap();

    let summary = RegressionSummary::capm(&capm, panel.date_range());
    let ascii = summary.to_ascii_table();
    assert!(ascii.contains("BKT.MC"));
    assert!(ascii.contains("ENG.MC"));
    assert!(!ascii.contains("ANA.MC"));

    let diagnostics = PanelDiagnostics {
        factor_range: panel.date_range(),
        panel_range: panel.date_range(),
        rows: panel.len(),
        columns: panel.column_count(),
        valid_stocks: excess.valid_stocks().iter().map(|s| s.to_string()).collect(),
        excluded_stocks: excess.excluded_stocks().to_vec(),
    };
    assert!(diagnostics.to_string().contains("Excluded:      ANA.MC"));

    let report = ReportBuilder::new()
        .index(panel.index_symbol())
        .stocks(diagnostics.valid_stocks.clone(), diagnostics.excluded_stocks.clone())
        .contents(serde_json::to_value(&summary).unwrap())
        .build()
        .unwrap();
    let json = report.to_json().unwrap();
    assert!(json.contains("\"index\": \"^IBEX\""));
    assert!(json.contains("\"model\": \"Capm\""));
}
