use super::*;
use crate::protocol::{DataType, ParamValue, ProtocolBuilder, SequenceBuilder};
use crate::report::Verdict;
use crate::rules::{EquivalenceRule, RuleConfig};

fn t1(tr: f64) -> Sequence {
    SequenceBuilder::new("T1")
        .parameter(
            Parameter::number("RepetitionTime", tr)
                .with_unit("ms")
                .with_rule(EquivalenceRule::tolerance(50.0).unwrap().into()),
        )
        .parameter(Parameter::numbers("EchoTime", vec![2.5, 5.0]).with_unit("ms"))
        .parameter(Parameter::token("PhaseEncodingDirection", "j-"))
        .build()
        .unwrap()
}

fn t2() -> Sequence {
    SequenceBuilder::new("T2")
        .parameter(Parameter::number("RepetitionTime", 3200.0).with_unit("ms"))
        .parameter(Parameter::text("SeriesDescription", "t2_spc").optional())
        .build()
        .unwrap()
}

fn flair() -> Sequence {
    SequenceBuilder::new("FLAIR")
        .parameter(Parameter::number("InversionTime", 1800.0).with_unit("ms"))
        .build()
        .unwrap()
}

fn protocol(sequences: Vec<Sequence>) -> Protocol {
    Protocol::new("ABCD", Some("3.0".to_string()), sequences).unwrap()
}

fn kinds(report: &ComplianceReport) -> Vec<DeviationKind> {
    report.iter().map(Deviation::kind).collect()
}

#[test]
fn test_identical_protocols_are_compliant() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0), t2()]);

    let report = compare(&reference, &reference.clone(), &registry).unwrap();
    assert!(report.is_compliant());
    assert!(report.is_empty());
}

#[test]
fn test_tolerance_scenarios() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0)]);

    let report = compare(&reference, &protocol(vec![t1(2040.0)]), &registry).unwrap();
    assert!(report.is_compliant());

    let report = compare(&reference, &protocol(vec![t1(2050.0)]), &registry).unwrap();
    assert!(report.is_compliant(), "tolerance bound is inclusive");

    let report = compare(&reference, &protocol(vec![t1(2100.0)]), &registry).unwrap();
    assert_eq!(report.verdict(), Verdict::NonCompliant);
    assert_eq!(report.len(), 1);

    let deviation = &report.deviations()[0];
    assert_eq!(deviation.location(), "T1.RepetitionTime");
    assert_eq!(deviation.kind(), DeviationKind::NonCompliant);
    assert_eq!(deviation.severity(), Severity::Failing);
    assert_eq!(deviation.reference(), Some(&ParamValue::Number(2000.0)));
    assert_eq!(deviation.candidate(), Some(&ParamValue::Number(2100.0)));
    assert_eq!(deviation.magnitude(), Some(100.0));
    assert!(matches!(deviation.rule(), Some(EquivalenceRule::Tolerance(_))));
}

#[test]
fn test_missing_sequence() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0), t2()]);
    let candidate = protocol(vec![t1(2000.0)]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(!report.is_compliant());
    assert_eq!(kinds(&report), [DeviationKind::MissingSequence]);

    let deviation = &report.deviations()[0];
    assert_eq!(deviation.sequence(), "T2");
    assert_eq!(deviation.parameter(), None);
}

#[test]
fn test_extra_sequence_is_informational() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0)]);
    let candidate = protocol(vec![flair(), t1(2000.0)]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_compliant());
    assert_eq!(kinds(&report), [DeviationKind::ExtraSequence]);
    assert_eq!(report.deviations()[0].severity(), Severity::Informational);
}

#[test]
fn test_missing_parameter_invokes_no_rule() {
    // Strict registry: resolving a rule for EchoTime or the token would fail
    let registry = RuleRegistry::strict();
    let reference = protocol(vec![SequenceBuilder::new("T1")
        .parameter(Parameter::numbers("EchoTime", vec![2.5]))
        .build()
        .unwrap()]);
    let candidate = protocol(vec![Sequence::new("T1", Vec::new()).unwrap()]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::MissingParameter]);
    assert_eq!(report.deviations()[0].severity(), Severity::Failing);
    assert_eq!(report.deviations()[0].candidate(), None);
}

#[test]
fn test_missing_optional_parameter_is_warning() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t2()]);
    let candidate = protocol(vec![SequenceBuilder::new("T2")
        .parameter(Parameter::number("RepetitionTime", 3200.0).with_unit("ms"))
        .build()
        .unwrap()]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_compliant());
    assert_eq!(report.count(Severity::Warning), 1);
}

#[test]
fn test_type_mismatch_precedes_rule() {
    let registry = RuleRegistry::strict();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::number("FlipAngle", 8.0))]);
    let candidate = protocol(vec![seq(Parameter::text("FlipAngle", "8"))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::TypeMismatch]);
}

#[test]
fn test_unspecified_value_is_failing() {
    let registry = RuleRegistry::new();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::number("FlipAngle", 8.0))]);
    let candidate = protocol(vec![seq(Parameter::unspecified("FlipAngle", DataType::Number))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::UnspecifiedValue]);
    assert!(!report.is_compliant());

    // Unspecified on both sides is still not compliant
    let report = compare(&candidate, &candidate.clone(), &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::UnspecifiedValue]);
}

#[test]
fn test_unit_mismatch() {
    let registry = RuleRegistry::new();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::number("RepetitionTime", 2.0).with_unit("s"))]);
    let candidate = protocol(vec![seq(
        Parameter::number("RepetitionTime", 2.0).with_unit("ms"),
    )]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::UnitMismatch]);
    let deviation = &report.deviations()[0];
    assert_eq!(deviation.reference_unit(), Some("s"));
    assert_eq!(deviation.candidate_unit(), Some("ms"));

    // A unit on one side only is not a mismatch
    let candidate = protocol(vec![seq(Parameter::number("RepetitionTime", 2.0))]);
    assert!(compare(&reference, &candidate, &registry).unwrap().is_empty());
}

#[test]
fn test_rule_severity_is_reported() {
    let registry = RuleRegistry::new().with_parameter_rule(
        "PhaseEncodingDirection",
        RuleConfig::exact().with_severity(Severity::Warning),
    );
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::token("PhaseEncodingDirection", "j-"))]);
    let candidate = protocol(vec![seq(Parameter::token("PhaseEncodingDirection", "j"))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_compliant());
    assert_eq!(report.deviations()[0].severity(), Severity::Warning);
}

#[test]
fn test_no_rule_fails_comparison() {
    let registry = RuleRegistry::strict();
    let reference = protocol(vec![t1(2000.0)]);

    let err = compare(&reference, &reference.clone(), &registry).unwrap_err();
    assert!(matches!(err, RuleError::NoRule { ref parameter, .. } if parameter == "EchoTime"));
}

#[test]
fn test_extra_parameters_option() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![SequenceBuilder::new("T1")
        .parameter(Parameter::number("RepetitionTime", 2000.0))
        .build()
        .unwrap()]);
    let candidate = protocol(vec![SequenceBuilder::new("T1")
        .parameter(Parameter::number("SliceThickness", 1.0))
        .parameter(Parameter::number("RepetitionTime", 2000.0))
        .build()
        .unwrap()]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_empty());

    let comparator = Comparator::new(&registry)
        .with_options(CompareOptions::default().with_extra_parameters(true));
    let report = comparator.compare(&reference, &candidate).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::ExtraParameter]);
    assert_eq!(report.deviations()[0].parameter(), Some("SliceThickness"));
    assert!(report.is_compliant());
}

#[test]
fn test_deviation_order_follows_traversal() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0), t2()]);
    let candidate = protocol(vec![
        flair(),
        SequenceBuilder::new("T1")
            .parameter(Parameter::token("PhaseEncodingDirection", "i"))
            .parameter(Parameter::number("RepetitionTime", 2500.0).with_unit("ms"))
            .build()
            .unwrap(),
    ]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    let locations: Vec<String> = report.iter().map(Deviation::location).collect();
    assert_eq!(
        locations,
        [
            "T1.RepetitionTime",
            "T1.EchoTime",
            "T1.PhaseEncodingDirection",
            "T2",
            "FLAIR"
        ]
    );

    let again = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(report, again);
}

#[test]
fn test_empty_reference_is_compliant() {
    let registry = RuleRegistry::new();
    let reference = ProtocolBuilder::new("empty").build().unwrap();
    let candidate = protocol(vec![t1(2000.0)]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_compliant());
    assert_eq!(kinds(&report), [DeviationKind::ExtraSequence]);
}

#[test]
fn test_batch_preserves_order() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0)]);
    let candidates: Vec<Protocol> = [2000.0, 2100.0, 2010.0, 3000.0]
        .into_iter()
        .map(|tr| protocol(vec![t1(tr)]))
        .collect();

    let outcomes =
        Comparator::new(&registry).compare_batch(&reference, &candidates, &CancellationToken::new());
    let verdicts: Vec<bool> = outcomes.iter().map(BatchOutcome::is_compliant).collect();
    assert_eq!(verdicts, [true, false, true, false]);

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(
        summary,
        BatchSummary {
            total: 4,
            compliant: 2,
            non_compliant: 2,
            failed: 0,
            cancelled: 0
        }
    );
}

#[test]
fn test_batch_cancelled_before_start() {
    let registry = RuleRegistry::new();
    let reference = protocol(vec![t1(2000.0)]);
    let candidates = vec![reference.clone(), reference.clone()];

    let token = CancellationToken::new();
    token.clone().cancel();
    assert!(token.is_cancelled());

    let outcomes = Comparator::new(&registry).compare_batch(&reference, &candidates, &token);
    assert!(outcomes.iter().all(|o| matches!(o, BatchOutcome::Cancelled)));
}

#[test]
fn test_batch_reports_rule_failures() {
    let registry = RuleRegistry::strict();
    let reference = protocol(vec![t1(2000.0)]);

    let outcomes = Comparator::new(&registry).compare_batch(
        &reference,
        &[reference.clone()],
        &CancellationToken::new(),
    );
    assert!(matches!(outcomes[0], BatchOutcome::Failed(RuleError::NoRule { .. })));
}

#[test]
fn test_comparator_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Comparator<'static>>();
    assert_send_sync::<Protocol>();
    assert_send_sync::<RuleRegistry>();
}

#[test]
fn test_neuroimaging_phase_encoding_must_match() {
    let registry = RuleRegistry::neuroimaging();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::token("PhaseEncodingDirection", "j-"))]);
    let candidate = protocol(vec![seq(Parameter::token("PhaseEncodingDirection", "j"))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::NonCompliant]);
    assert!(!report.is_compliant());

    let same = protocol(vec![seq(Parameter::token("PhaseEncodingDirection", "J-"))]);
    assert!(compare(&reference, &same, &registry).unwrap().is_empty());
}

#[test]
fn test_ignored_parameter_skips_unspecified_check() {
    let registry = RuleRegistry::new().with_parameter_rule("AcquisitionTime", RuleConfig::ignore());
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::unspecified("AcquisitionTime", DataType::Text))]);
    let candidate = protocol(vec![seq(Parameter::text("AcquisitionTime", "101530.250000"))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_empty());
    assert!(compare(&reference, &reference.clone(), &registry).unwrap().is_empty());
}

#[test]
fn test_ignored_parameter_skips_unit_check() {
    let registry = RuleRegistry::neuroimaging();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::number("SliceLocation", 12.0).with_unit("mm"))]);
    let candidate = protocol(vec![seq(Parameter::number("SliceLocation", 1.5).with_unit("cm"))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_unspecified_reported_before_missing_rule() {
    let registry = RuleRegistry::strict();
    let seq = |p| SequenceBuilder::new("T1").parameter(p).build().unwrap();
    let reference = protocol(vec![seq(Parameter::unspecified("FlipAngle", DataType::Number))]);
    let candidate = protocol(vec![seq(Parameter::number("FlipAngle", 8.0))]);

    let report = compare(&reference, &candidate, &registry).unwrap();
    assert_eq!(kinds(&report), [DeviationKind::UnspecifiedValue]);
}
