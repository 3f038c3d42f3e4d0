use super::*;
use crate::protocol::{DataType, ParamValue};

fn header(json: &str) -> RawHeader {
    RawHeader::from_json(json).unwrap()
}

fn approx(value: &ParamValue, expected: f64) -> bool {
    matches!(value, ParamValue::Number(v) if (v - expected).abs() < 1e-9)
}

#[test]
fn test_raw_value_conversion() {
    assert_eq!(
        RawValue::Number(2000.0).to_param(DataType::Number).unwrap(),
        ParamValue::Number(2000.0)
    );
    assert_eq!(
        RawValue::Number(2.5).to_param(DataType::Numbers).unwrap(),
        ParamValue::Numbers(vec![2.5])
    );
    assert_eq!(
        RawValue::Text("2000".to_string()).to_param(DataType::Number).unwrap(),
        ParamValue::Number(2000.0)
    );
    assert!(RawValue::Null.to_param(DataType::Number).unwrap().is_unspecified());
    assert!(RawValue::Text(" ".to_string()).to_param(DataType::Token).unwrap().is_unspecified());
    assert!(RawValue::List(vec![]).to_param(DataType::Numbers).unwrap().is_unspecified());
    assert!(RawValue::Text("long".to_string()).to_param(DataType::Number).is_err());
}

#[test]
fn test_raw_value_lists() {
    let list = RawValue::List(vec![RawValue::Number(0.0), RawValue::Number(256.0)]);
    assert_eq!(
        list.to_param(DataType::Numbers).unwrap(),
        ParamValue::Numbers(vec![0.0, 256.0])
    );
    assert!(list.to_param(DataType::Number).is_err());

    let tokens = RawValue::List(vec![
        RawValue::Text("GR".to_string()),
        RawValue::Text("IR".to_string()),
    ]);
    assert_eq!(
        tokens.to_param(DataType::Token).unwrap(),
        ParamValue::Token("GR\\IR".to_string())
    );
}

#[test]
fn test_dicom_json_elements() {
    let h = header(
        r#"{
            "00180080": {"vr": "DS", "Value": [2000]},
            "00180020": {"vr": "CS", "Value": ["GR", "IR"]},
            "00180082": {"vr": "DS"}
        }"#,
    );
    let tr = catalog::by_name("RepetitionTime").unwrap();
    assert_eq!(
        h.find(tr).unwrap().to_param(DataType::Number).unwrap(),
        ParamValue::Number(2000.0)
    );
    let ti = catalog::by_name("InversionTime").unwrap();
    assert!(h.find(ti).unwrap().to_param(DataType::Number).unwrap().is_unspecified());
    assert_eq!(
        h.get_tag(DicomTag::new(0x0018, 0x0020)).unwrap().as_text().as_deref(),
        Some("GR\\IR")
    );
}

#[test]
fn test_tag_parsing() {
    let tag: DicomTag = "(0018,0080)".parse().unwrap();
    assert_eq!(tag, DicomTag::new(0x0018, 0x0080));
    assert_eq!("00180080".parse::<DicomTag>().unwrap(), tag);
    assert_eq!("0018, 0080".parse::<DicomTag>().unwrap(), tag);
    assert_eq!(tag.to_string(), "(0018,0080)");
    assert!(DicomTag::new(0x0029, 0x1020).is_private());

    assert!(matches!("0018".parse::<DicomTag>(), Err(AdapterError::InvalidTag(_))));
    assert!("(00XY,0080)".parse::<DicomTag>().is_err());
}

#[test]
fn test_catalog_lookup() {
    assert_eq!(catalog::lookup("TR").unwrap().name, "RepetitionTime");
    assert_eq!(catalog::lookup("fa").unwrap().name, "FlipAngle");
    assert_eq!(catalog::lookup("(0018,1312)").unwrap().name, "PhaseEncodingDirection");
    assert_eq!(catalog::lookup("PSMP").unwrap().name, "PercentSampling");
    assert!(catalog::lookup("Nonexistent").is_none());

    let core: Vec<&str> = catalog::CATALOG
        .iter()
        .filter(|spec| spec.core)
        .map(|spec| spec.name)
        .collect();
    assert_eq!(
        core,
        ["ScanningSequence", "PhaseEncodingDirection", "RepetitionTime", "EchoTime", "FlipAngle"]
    );
}

#[test]
fn test_dicom_adapter_core_parameters() {
    let h = header(
        r#"{
            "SeriesDescription": "t1_mprage",
            "RepetitionTime": 2300,
            "EchoTime": 2.98,
            "MagneticFieldStrength": "3"
        }"#,
    );
    let protocol = DicomAdapter::new().protocol("acquired", &[h]).unwrap();
    let t1 = protocol.sequence("t1_mprage").unwrap();

    assert_eq!(t1.parameter("RepetitionTime").unwrap().value(), &ParamValue::Number(2300.0));
    assert_eq!(t1.parameter("EchoTime").unwrap().value(), &ParamValue::Numbers(vec![2.98]));
    assert_eq!(t1.parameter("MagneticFieldStrength").unwrap().unit(), Some("T"));

    // Absent core parameters are reported, never imputed
    let flip = t1.parameter("FlipAngle").unwrap();
    assert!(flip.value().is_unspecified());
    assert_eq!(flip.unit(), Some("deg"));
    assert!(t1.parameter("ScanningSequence").unwrap().value().is_unspecified());

    // Absent non-core parameters are left out
    assert!(!t1.contains("InversionTime"));
    assert!(!t1.contains("MultiSliceMode"));
}

#[test]
fn test_dicom_adapter_groups_multi_echo() {
    let echo = |te: f64| {
        RawHeader::new()
            .with("SeriesDescription", RawValue::Text("gre_field_map".to_string()))
            .with("RepetitionTime", RawValue::Number(500.0))
            .with("EchoTime", RawValue::Number(te))
    };
    let other = RawHeader::new()
        .with("ProtocolName", RawValue::Text("rest_bold".to_string()))
        .with("RepetitionTime", RawValue::Number(800.0));

    let headers = [echo(7.38), other, echo(4.92), echo(7.38)];
    let protocol = DicomAdapter::new().protocol("acquired", &headers).unwrap();

    let names: Vec<&str> = protocol.sequences().iter().map(|s| s.name()).collect();
    assert_eq!(names, ["gre_field_map", "rest_bold"]);
    assert_eq!(
        protocol.parameter("gre_field_map", "EchoTime").unwrap().value(),
        &ParamValue::Numbers(vec![4.92, 7.38])
    );
}

#[test]
fn test_dicom_adapter_missing_sequence_name() {
    let headers = [
        header(r#"{"SeriesDescription": "t1"}"#),
        header(r#"{"RepetitionTime": 2000}"#),
    ];
    assert!(matches!(
        DicomAdapter::new().protocol("acquired", &headers),
        Err(AdapterError::MissingSequenceName(1))
    ));
}

#[test]
fn test_dicom_adapter_invalid_value() {
    let h = header(r#"{"SeriesDescription": "t1", "RepetitionTime": "long"}"#);
    match DicomAdapter::new().protocol("acquired", &[h]) {
        Err(AdapterError::InvalidValue { parameter, .. }) => assert_eq!(parameter, "RepetitionTime"),
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_dicom_adapter_csa_header() {
    let phoenix = "### ASCCONV BEGIN ###\n\
        sKSpace.ucMultiSliceMode = 0x2\n\
        sPat.ucPATMode = 0x1\n\
        ### ASCCONV END ###\n";
    let h = RawHeader::new()
        .with("SeriesDescription", RawValue::Text("bold".to_string()))
        .with("(0029,1020)", RawValue::Text(phoenix.to_string()));

    let protocol = DicomAdapter::new().protocol("acquired", &[h.clone()]).unwrap();
    let bold = protocol.sequence("bold").unwrap();
    assert_eq!(bold.parameter("MultiSliceMode").unwrap().value(), &ParamValue::Token("interleaved".to_string()));
    assert_eq!(bold.parameter("PATMode").unwrap().value(), &ParamValue::Token("Not Selected".to_string()));
    assert!(bold.parameter("ShimMode").unwrap().value().is_unspecified());

    let plain = DicomAdapter::without_csa().protocol("acquired", &[h]).unwrap();
    assert!(!plain.sequence("bold").unwrap().contains("MultiSliceMode"));
}

#[test]
fn test_dicom_adapter_csa_markers_on_one_line() {
    let h = RawHeader::new()
        .with("SeriesDescription", RawValue::Text("bold".to_string()))
        .with(
            "MrPhoenixProtocol",
            RawValue::Text("### ASCCONV BEGIN ### sPat.ucPATMode = 0x2 ### ASCCONV END ###\n".to_string()),
        );

    let protocol = DicomAdapter::new().protocol("acquired", &[h]).unwrap();
    assert_eq!(
        protocol.parameter("bold", "PATMode").unwrap().value(),
        &ParamValue::Token("Grappa".to_string())
    );
}

#[test]
fn test_dicom_adapter_rejects_unknown_phase_encoding_direction() {
    let h = header(r#"{"SeriesDescription": "t1", "PhaseEncodingDirection": "DIAGONAL"}"#);
    match DicomAdapter::new().protocol("acquired", &[h]) {
        Err(AdapterError::InvalidValue { parameter, .. }) => {
            assert_eq!(parameter, "PhaseEncodingDirection")
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }

    let h = header(r#"{"SeriesDescription": "t1", "PhaseEncodingDirection": "COL "}"#);
    let protocol = DicomAdapter::new().protocol("acquired", &[h]).unwrap();
    assert_eq!(
        protocol.parameter("t1", "PhaseEncodingDirection").unwrap().value(),
        &ParamValue::Token("COL".to_string())
    );
}

#[test]
fn test_dicom_adapter_rejects_non_finite_text() {
    let h = header(r#"{"SeriesDescription": "t1", "RepetitionTime": "NaN"}"#);
    assert!(matches!(
        DicomAdapter::new().protocol("acquired", &[h]),
        Err(AdapterError::InvalidValue { .. })
    ));
}

#[test]
fn test_dicom_adapter_effective_echo_spacing() {
    let h = header(
        r#"{"SeriesDescription": "dwi", "PixelBandwidth": 2000, "PhaseEncodingSteps": 100}"#,
    );
    let protocol = DicomAdapter::new().protocol("acquired", &[h]).unwrap();
    let ees = protocol.parameter("dwi", "EffectiveEchoSpacing").unwrap();
    assert!(approx(ees.value(), 5e-6));
    assert_eq!(ees.unit(), Some("s"));

    let zero = header(r#"{"SeriesDescription": "dwi", "PixelBandwidth": 0, "PhaseEncodingSteps": 100}"#);
    let protocol = DicomAdapter::new().protocol("acquired", &[zero]).unwrap();
    assert!(!protocol.sequence("dwi").unwrap().contains("EffectiveEchoSpacing"));

    let explicit = header(r#"{"SeriesDescription": "dwi", "EffectiveEchoSpacing": 0.00051, "PixelBandwidth": 2000, "PhaseEncodingSteps": 100}"#);
    let protocol = DicomAdapter::new().protocol("acquired", &[explicit]).unwrap();
    assert!(approx(protocol.parameter("dwi", "EffectiveEchoSpacing").unwrap().value(), 0.00051));
}

#[test]
fn test_dicom_adapter_session() {
    let h = header(r#"{"SeriesDescription": "t1", "PatientID": "SUBJ01", "StudyID": "1"}"#);
    let protocol = DicomAdapter::new().protocol("acquired", &[h]).unwrap();
    let session = protocol.session().unwrap();
    assert_eq!(session.subject_id.as_deref(), Some("SUBJ01"));
    assert_eq!(session.session_id.as_deref(), Some("1"));
}

#[test]
fn test_bids_adapter_converts_seconds() {
    let h = header(
        r#"{
            "ProtocolName": "T1w_MPR",
            "RepetitionTime": 2.0,
            "EchoTime": 0.005,
            "InversionTime": 1.1,
            "FlipAngle": 8,
            "PhaseEncodingDirection": "j-"
        }"#,
    );
    let protocol = BidsAdapter::new().protocol("bids", &[h]).unwrap();
    let seq = protocol.sequence("T1w_MPR").unwrap();

    assert!(approx(seq.parameter("RepetitionTime").unwrap().value(), 2000.0));
    assert!(approx(seq.parameter("InversionTime").unwrap().value(), 1100.0));
    match seq.parameter("EchoTime").unwrap().value() {
        ParamValue::Numbers(v) => assert!((v[0] - 5.0).abs() < 1e-9),
        other => panic!("unexpected echo time {:?}", other),
    }
    assert_eq!(seq.parameter("FlipAngle").unwrap().value(), &ParamValue::Number(8.0));
    assert_eq!(
        seq.parameter("PhaseEncodingDirection").unwrap().value(),
        &ParamValue::Token("j-".to_string())
    );
}

#[test]
fn test_bids_session_from_path() {
    let session = session_from_path(std::path::Path::new("/data/sub-01_ses-pre_run-2_T1w.json")).unwrap();
    assert_eq!(session.subject_id.as_deref(), Some("01"));
    assert_eq!(session.session_id.as_deref(), Some("pre"));
    assert_eq!(session.run_id.as_deref(), Some("2"));

    assert!(session_from_path(std::path::Path::new("T1w.json")).is_none());
}

#[test]
fn test_bids_load_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let t1 = dir.path().join("sub-07_run-1_T1w.json");
    let bold = dir.path().join("sub-07_run-1_task-rest_bold.json");
    std::fs::write(&t1, r#"{"RepetitionTime": 2.3, "FlipAngle": 9}"#).unwrap();
    std::fs::write(&bold, r#"{"SeriesDescription": "rest", "RepetitionTime": 0.8}"#).unwrap();

    let protocol = BidsAdapter::new().load_protocol("bids", &[&t1, &bold]).unwrap();
    let names: Vec<&str> = protocol.sequences().iter().map(|s| s.name()).collect();
    assert_eq!(names, ["T1w", "rest"]);
    assert_eq!(protocol.session().unwrap().to_string(), "sub-07_run-1");

    std::fs::write(&t1, "{ not json").unwrap();
    assert!(matches!(
        BidsAdapter::new().load_protocol("bids", &[&t1]),
        Err(AdapterError::JsonError(_))
    ));
}
