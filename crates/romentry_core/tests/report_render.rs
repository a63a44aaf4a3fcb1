use romentry_core::report::{
    render_spreadsheet, render_text, validate_template, Cell, SpreadsheetTemplate,
};
use romentry_core::{
    clinical_form, FormConfig, FormSynchronizer, MemoryForm, NativeValue, Registry, ReportError,
    ReportKind,
};

const TEXT_TEMPLATE: &str = "\
Potilas: {TiedotNimi}
Paino: {AntropPaino}
Pituus: {AntropPituus}
Lonkan fleksio oikea: {LonkkaFleksioOik}
Polven ekstensio oikea: {IsokinPolviEkstensioOikNormUn} ({IsokinPolviEkstensioOikNorm})
";

fn measured_form<'a>() -> FormSynchronizer<'a, MemoryForm> {
    let config = FormConfig::default();
    let registry = Registry::build(&clinical_form(), &config.body_weight_control).unwrap();
    let view = MemoryForm::for_registry(&registry);
    let mut sync = FormSynchronizer::new(registry, view, config).unwrap();

    let edits = [
        ("lnTiedotNimi", NativeValue::text("Testi Potilas")),
        ("spAntropPaino", NativeValue::Number(80.0)),
        ("csbLonkkaFleksioOik", NativeValue::Number(115.0)),
        ("spIsokinPolviEkstensioOikNormUn", NativeValue::Number(200.0)),
    ];
    for (id, value) in edits {
        let native = sync.view_mut().set(id, value);
        sync.on_control_changed(id, native).unwrap();
    }
    sync
}

#[test]
fn text_report_has_units_and_skips_unmeasured_lines() {
    let sync = measured_form();
    let data = sync.report_data(ReportKind::Text.includes_units());

    let text = render_text(&data, TEXT_TEMPLATE).unwrap();
    assert_eq!(
        text,
        "Potilas: Testi Potilas\n\
         Paino: 80 kg\n\
         Lonkan fleksio oikea: 115°\n\
         Polven ekstensio oikea: 200 Nm (2.5 Nm/kg)\n"
    );
}

#[test]
fn isokinetic_report_has_no_units() {
    let sync = measured_form();
    assert!(!ReportKind::IsokineticText.includes_units());
    let data = sync.report_data(ReportKind::IsokineticText.includes_units());

    let text = render_text(&data, "{IsokinPolviEkstensioOikNormUn};{IsokinPolviEkstensioOikNorm}").unwrap();
    assert_eq!(text, "200;2.5\n");
}

#[test]
fn spreadsheet_report_types_cells() {
    let sync = measured_form();
    let data = sync.report_data(ReportKind::Spreadsheet.includes_units());
    let template = SpreadsheetTemplate::from_tsv(
        "Nimi\t{TiedotNimi}\nPaino\t{AntropPaino}\nPituus\t{AntropPituus}\nKaatuilu\t{KyselyKaatuilu}",
    );

    let sheet = render_spreadsheet(&data, &template).unwrap();
    assert_eq!(sheet.cell(0, 1), Some(&Cell::Text("Testi Potilas".to_string())));
    assert_eq!(sheet.cell(1, 1), Some(&Cell::Number(80.0)));
    assert_eq!(sheet.cell(2, 1), Some(&Cell::Empty));
    assert_eq!(sheet.cell(3, 1), Some(&Cell::Empty));
    assert_eq!(ReportKind::Spreadsheet.file_prefix(), "Rom_excel_");
}

#[test]
fn templates_are_checked_against_the_form() {
    let config = FormConfig::default();
    let registry = Registry::build(&clinical_form(), &config.body_weight_control).unwrap();
    let known = registry.all_variable_names();

    let fields = validate_template(TEXT_TEMPLATE, &known).unwrap();
    assert_eq!(fields.len(), 6);
    assert_eq!(
        validate_template("{AntropPaino} {Haamu}", &known),
        Err(ReportError::UnknownField("Haamu".to_string()))
    );
}
