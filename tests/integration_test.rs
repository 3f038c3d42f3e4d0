//! Integration tests for mrprotocol
//!
//! These tests run the full pipeline from reference definitions and raw
//! metadata to compliance reports and their exports.

use mrprotocol::adapters::{BidsAdapter, DicomAdapter, ProtocolAdapter, RawHeader};
use mrprotocol::comparator::{
    BatchOutcome, BatchSummary, CancellationToken, Comparator, DeviationKind, Severity,
};
use mrprotocol::definition::ProtocolDefinition;
use mrprotocol::protocol::ParamValue;
use mrprotocol::report::Verdict;
use mrprotocol::rules::RuleRegistry;
use std::fs;
use tempfile::tempdir;

const REFERENCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<protocol name="ABCD" version="3.0">
  <rules>
    <rule type="number" kind="tolerance" tolerance="0.001"/>
    <rule type="numbers" kind="tolerance" tolerance="0.01"/>
    <rule parameter="FlipAngle" kind="tolerance" tolerance="1" severity="warning"/>
  </rules>
  <sequence name="t1_mprage">
    <parameter name="RepetitionTime" type="number" unit="ms" value="2500">
      <rule kind="tolerance" tolerance="50"/>
    </parameter>
    <parameter name="EchoTime" type="numbers" unit="ms" value="2.88"/>
    <parameter name="FlipAngle" type="number" unit="deg" value="8"/>
    <parameter name="PhaseEncodingDirection" type="token" value="ROW">
      <rule kind="set"><allowed value="ROW"/><allowed value="COL"/></rule>
    </parameter>
  </sequence>
  <sequence name="rest_bold">
    <parameter name="RepetitionTime" type="number" unit="ms" value="800"/>
    <parameter name="MultiSliceMode" type="token" value="interleaved"/>
  </sequence>
</protocol>"#;

const SESSION: &str = r####"[
  {
    "SeriesDescription": "t1_mprage",
    "PatientID": "SUBJ01",
    "RepetitionTime": 2540,
    "EchoTime": 2.88,
    "FlipAngle": 9.5,
    "PhaseEncodingDirection": "COL"
  },
  {
    "SeriesDescription": "rest_bold",
    "00180080": {"vr": "DS", "Value": [800]},
    "MrPhoenixProtocol": "### ASCCONV BEGIN ###\nsKSpace.ucMultiSliceMode = 0x1\n### ASCCONV END ###\n"
  },
  {
    "SeriesDescription": "localizer",
    "RepetitionTime": 8.6
  }
]"####;

fn reference() -> (ProtocolDefinition, RuleRegistry) {
    let definition = ProtocolDefinition::from_str(REFERENCE).unwrap();
    let registry = definition.registry(RuleRegistry::neuroimaging());
    (definition, registry)
}

fn session(json: &str) -> mrprotocol::protocol::Protocol {
    let headers: Vec<RawHeader> = serde_json::from_str(json).unwrap();
    DicomAdapter::new().protocol("session", &headers).unwrap()
}

/// Reference definition against a DICOM session, end to end
#[test]
fn test_definition_against_dicom_session() {
    let (definition, registry) = reference();
    let candidate = session(SESSION);

    let report = Comparator::new(&registry)
        .compare(&definition.protocol, &candidate)
        .unwrap();

    let locations: Vec<String> = report.iter().map(|d| d.location()).collect();
    assert_eq!(
        locations,
        ["t1_mprage.FlipAngle", "rest_bold.MultiSliceMode", "localizer"]
    );

    let flip = &report.deviations()[0];
    assert_eq!(flip.kind(), DeviationKind::NonCompliant);
    assert_eq!(flip.severity(), Severity::Warning);
    assert_eq!(flip.magnitude(), Some(1.5));

    let slice_mode = &report.deviations()[1];
    assert_eq!(slice_mode.severity(), Severity::Failing);
    assert_eq!(
        slice_mode.candidate(),
        Some(&ParamValue::Token("sequential".to_string()))
    );

    assert_eq!(report.deviations()[2].kind(), DeviationKind::ExtraSequence);
    assert_eq!(report.verdict(), Verdict::NonCompliant);
    assert_eq!(report.candidate().session.as_ref().unwrap().to_string(), "sub-SUBJ01");

    let counts = report.counts();
    assert_eq!((counts.failing, counts.warning, counts.informational), (1, 1, 1));
}

/// JSON and TSV exports of the same comparison are reproducible
#[test]
fn test_report_exports() {
    let (definition, registry) = reference();
    let candidate = session(SESSION);
    let comparator = Comparator::new(&registry);

    let first = comparator.compare(&definition.protocol, &candidate).unwrap();
    let second = comparator.compare(&definition.protocol, &candidate).unwrap();
    let json = first.export().to_json().unwrap();
    assert_eq!(json, second.export().to_json().unwrap());

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["verdict"], "non_compliant");
    assert_eq!(value["reference"]["name"], "ABCD");
    assert_eq!(value["summary"]["failing"], 1);
    assert_eq!(
        value["sequences"]["rest_bold"]["MultiSliceMode"][0]["kind"],
        "non_compliant"
    );
    assert_eq!(value["sequences"]["localizer"]["*"][0]["kind"], "extra_sequence");

    let tsv = first.export().to_tsv().unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("sequence\tparameter\tkind"));
    assert!(lines[2].starts_with("rest_bold\tMultiSliceMode\tnon_compliant\tfailing"));
}

/// An acquisition promoted to a reference is compliant with itself
#[test]
fn test_promote_acquisition_to_reference() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.xml");

    let acquired = session(SESSION);
    ProtocolDefinition::new(acquired.clone())
        .write_to_path(&path)
        .unwrap();

    let promoted = ProtocolDefinition::from_path(&path).unwrap();
    assert_eq!(promoted.protocol, acquired);

    // Unspecified core parameters still fail, everything else matches
    let registry = promoted.registry(RuleRegistry::neuroimaging());
    let report = Comparator::new(&registry)
        .compare(&promoted.protocol, &acquired)
        .unwrap();
    assert!(report
        .iter()
        .all(|d| d.kind() == DeviationKind::UnspecifiedValue));
    assert!(report.iter().any(|d| d.location() == "localizer.FlipAngle"));
}

/// BIDS sidecars in seconds compare against a millisecond reference
#[test]
fn test_bids_session_against_reference() {
    let dir = tempdir().unwrap();
    let t1 = dir.path().join("sub-01_ses-baseline_T1w.json");
    fs::write(
        &t1,
        r#"{
            "SeriesDescription": "t1_mprage",
            "RepetitionTime": 2.5,
            "EchoTime": 0.00288,
            "FlipAngle": 8,
            "PhaseEncodingDirection": "ROW"
        }"#,
    )
    .unwrap();

    let (definition, registry) = reference();
    let candidate = BidsAdapter::new().load_protocol("bids", &[&t1]).unwrap();
    assert_eq!(candidate.session().unwrap().to_string(), "sub-01_ses-baseline");

    let report = Comparator::new(&registry)
        .compare(&definition.protocol, &candidate)
        .unwrap();

    let locations: Vec<String> = report.iter().map(|d| d.location()).collect();
    assert_eq!(locations, ["rest_bold"]);
    assert_eq!(report.deviations()[0].kind(), DeviationKind::MissingSequence);
}

/// Many sessions on the worker pool, outcomes in input order
#[test]
fn test_batch_sessions() {
    let (definition, registry) = reference();
    let compliant = r#"[
        {"SeriesDescription": "t1_mprage", "RepetitionTime": 2500, "EchoTime": 2.88,
         "FlipAngle": 8, "PhaseEncodingDirection": "ROW"},
        {"SeriesDescription": "rest_bold", "RepetitionTime": 800,
         "MrPhoenixProtocol": "sKSpace.ucMultiSliceMode = 0x2"}
    ]"#;

    let candidates: Vec<_> = (0..12)
        .map(|i| if i % 3 == 0 { session(SESSION) } else { session(compliant) })
        .collect();

    let outcomes = Comparator::new(&registry).compare_batch(
        &definition.protocol,
        &candidates,
        &CancellationToken::new(),
    );
    assert_eq!(outcomes.len(), 12);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.is_compliant(), i % 3 != 0, "candidate {}", i);
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.total, 12);
    assert_eq!(summary.compliant, 8);
    assert_eq!(summary.non_compliant, 4);

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = Comparator::new(&registry).compare_batch(&definition.protocol, &candidates, &token);
    assert!(cancelled.iter().all(|o| matches!(o, BatchOutcome::Cancelled)));
}
