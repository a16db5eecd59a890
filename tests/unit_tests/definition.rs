use crate::{end_points_region, segment_region};
use fenris_terms::definition::{build_terms, TermDefinition};
use fenris_terms::error::TermError;
use fenris_terms::term::{Term, TermKind};
use fenris_terms::Integral;

const DEFINITIONS: &str = r#"[
    { "name": "dw_volume_wdot", "region": "Omega", "integral": "gauss2", "sign": -1.0,
      "args": ["y", "q", "p"] },
    { "name": "de_volume_average_mat", "region": "Omega", "integral": "gauss2",
      "args": ["m", "u"], "material_shape": [3, 1] },
    { "name": "dw_volume_wdot_th", "region": "Omega", "integral": "gauss2",
      "args": ["ts", "G", "q", "p", "p0"], "history_window": 5 },
    { "name": "d_surface_integrate", "region": "Gamma", "integral": "gauss2", "args": ["u"] }
]"#;

#[test]
fn definitions_deserialize_with_defaults() {
    let definitions: Vec<TermDefinition> = serde_json::from_str(DEFINITIONS).unwrap();
    assert_eq!(definitions.len(), 4);

    assert_eq!(definitions[0].sign, -1.0);
    assert_eq!(definitions[0].integral, Integral::new("gauss2"));
    assert_eq!(definitions[1].sign, 1.0);
    assert_eq!(definitions[1].material_shape, Some((3, 1)));
    assert_eq!(definitions[2].history_window, Some(5));
    assert_eq!(definitions[3].material_shape, None);
}

#[test]
fn build_terms_from_definitions() {
    let definitions: Vec<TermDefinition> = serde_json::from_str(DEFINITIONS).unwrap();
    let regions = [segment_region(4), end_points_region(4)];
    let terms: Vec<Term<f64>> = build_terms(&definitions, &regions).unwrap();

    assert_eq!(terms.len(), 4);
    assert_eq!(terms[0].kind(), TermKind::WDotProductVolumeOperator);
    assert_eq!(terms[0].sign(), -1.0);
    assert_eq!(terms[0].arg_names(), &["y", "q", "p"]);
    assert_eq!(terms[1].options().material_shape, (3, 1));
    assert_eq!(terms[1].options().history_window, None);
    assert_eq!(terms[2].options().material_shape, (1, 1));
    assert_eq!(terms[2].options().history_window, Some(5));
    assert_eq!(terms[3].region().name(), "Gamma");
}

#[test]
fn unknown_term_name_is_an_error() {
    let definition = TermDefinition {
        name: "dw_unknown".to_string(),
        region: "Omega".to_string(),
        integral: Integral::new("gauss2"),
        sign: 1.0,
        args: vec!["u".to_string()],
        material_shape: None,
        history_window: None,
    };
    let result = Term::<f64>::from_definition(&definition, segment_region(4));
    assert_eq!(result.unwrap_err(), TermError::UnknownTerm("dw_unknown".to_string()));
}

#[test]
fn argument_count_is_checked() {
    let json = r#"{ "name": "d_volume_dot", "region": "Omega", "integral": "gauss2", "args": ["u"] }"#;
    let definition: TermDefinition = serde_json::from_str(json).unwrap();
    let result = Term::<f64>::from_definition(&definition, segment_region(4));
    assert!(matches!(
        result,
        Err(TermError::ArgumentCount {
            expected: 2,
            found: 1,
            ..
        })
    ));
}

#[test]
fn build_terms_reports_missing_region() {
    let json = r#"[{ "name": "d_volume", "region": "Left", "integral": "gauss2", "args": ["u"] }]"#;
    let definitions: Vec<TermDefinition> = serde_json::from_str(json).unwrap();
    let error = build_terms::<f64>(&definitions, &[segment_region(4)]).unwrap_err();
    assert!(error.to_string().contains("Left"));

    let json = r#"[{ "name": "d_volume", "region": "Omega", "integral": "gauss2", "args": [] }]"#;
    let definitions: Vec<TermDefinition> = serde_json::from_str(json).unwrap();
    let error = build_terms::<f64>(&definitions, &[segment_region(4)]).unwrap_err();
    assert!(error.to_string().contains("d_volume"));
    assert!(error.downcast_ref::<TermError>().is_some());
}
