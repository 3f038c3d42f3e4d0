//! Property tests for comparison invariants

use mrprotocol::comparator::{Comparator, DeviationKind};
use mrprotocol::protocol::{
    ParamValue, Parameter, Protocol, ProtocolBuilder, Sequence, SequenceBuilder,
};
use mrprotocol::rules::{
    EquivalenceRule, RuleConfig, RuleError, RuleRegistry, Tolerance, ToleranceMode,
};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    -1e6..1e6f64
}

/// Values of every data type
fn value_strategy() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        finite().prop_map(ParamValue::Number),
        prop::collection::vec(finite(), 0..4).prop_map(ParamValue::Numbers),
        "[ a-z0-9_]{0,8}".prop_map(ParamValue::Text),
        "[a-z]{1,4}-?".prop_map(ParamValue::Token),
    ]
}

/// Sequences with distinct names, each with a few parameters of mixed types
fn protocol_strategy() -> impl Strategy<Value = Protocol> {
    prop::collection::btree_map(
        "[A-Z][a-z0-9]{0,6}",
        prop::collection::btree_map("[A-Z][A-Za-z]{1,10}", value_strategy(), 0..6),
        0..5,
    )
    .prop_map(|sequences| {
        let mut builder = ProtocolBuilder::new("generated");
        for (name, params) in sequences {
            let sequence = SequenceBuilder::new(name)
                .parameters(params.into_iter().map(|(param, value)| {
                    let data_type = value.data_type().unwrap();
                    Parameter::new(param, data_type, value).unwrap()
                }))
                .build()
                .unwrap();
            builder = builder.sequence(sequence);
        }
        builder.build().unwrap()
    })
}

/// Copy of `protocol` keeping the parameters accepted by `keep`, after `map`
fn rebuild(
    protocol: &Protocol,
    name: &str,
    keep: impl Fn(&str, &Parameter) -> bool,
    map: impl Fn(&str, &Parameter) -> Parameter,
) -> Protocol {
    let sequences: Vec<Sequence> = protocol
        .sequences()
        .iter()
        .map(|s| {
            let kept = s
                .iter()
                .filter(|p| keep(s.name(), p))
                .map(|p| map(s.name(), p))
                .collect();
            Sequence::new(s.name(), kept).unwrap()
        })
        .collect();
    Protocol::new(name, None, sequences).unwrap()
}

fn single(tr: f64) -> Protocol {
    ProtocolBuilder::new("P")
        .sequence(
            SequenceBuilder::new("T1")
                .parameter(Parameter::number("RepetitionTime", tr))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

proptest! {
    /// A protocol compared with an identical copy has no deviations
    #[test]
    fn test_identical_copy_is_compliant(protocol in protocol_strategy()) {
        let registry = RuleRegistry::new();
        let report = Comparator::new(&registry).compare(&protocol, &protocol.clone()).unwrap();
        prop_assert!(report.is_empty());
        prop_assert!(report.is_compliant());
    }

    /// Comparing twice gives the same deviations in the same order
    #[test]
    fn test_deviation_order_is_stable(reference in protocol_strategy(), candidate in protocol_strategy()) {
        let registry = RuleRegistry::new();
        let comparator = Comparator::new(&registry);
        let first = comparator.compare(&reference, &candidate).unwrap();
        let second = comparator.compare(&reference, &candidate).unwrap();
        prop_assert_eq!(first.deviations(), second.deviations());
        prop_assert_eq!(first.export().to_json().unwrap(), second.export().to_json().unwrap());
    }

    /// Absolute tolerance is compliant exactly when |ref - cand| <= tol
    #[test]
    fn test_tolerance_bound(reference in finite(), candidate in finite(), tol in 0.0..1e4f64) {
        let registry = RuleRegistry::new()
            .with_parameter_rule("RepetitionTime", EquivalenceRule::tolerance(tol).unwrap().into());
        let report = Comparator::new(&registry)
            .compare(&single(reference), &single(candidate))
            .unwrap();
        prop_assert_eq!(report.is_compliant(), (reference - candidate).abs() <= tol);
    }

    /// The boundary itself is compliant
    #[test]
    fn test_tolerance_boundary_inclusive(reference in -1000..1000i32, tol in 0..1000u32) {
        let (reference, tol) = (f64::from(reference), f64::from(tol));
        let tolerance = Tolerance::new(tol, ToleranceMode::Absolute).unwrap();
        prop_assert!(tolerance.within(reference, reference + tol));
        prop_assert!(tolerance.within(reference, reference - tol));
        prop_assert!(!tolerance.within(reference, reference + tol + 1.0));
    }

    /// Negative tolerances are rejected
    #[test]
    fn test_negative_tolerance_rejected(tol in -1e6..-1e-9f64) {
        prop_assert_eq!(EquivalenceRule::tolerance(tol), Err(RuleError::InvalidTolerance(tol)));
    }

    /// Removing one reference parameter from the candidate yields exactly one
    /// MissingParameter deviation. Every other parameter carries its own rule
    /// and the registry is strict, so resolving a rule for the missing one
    /// would fail the comparison.
    #[test]
    fn test_missing_parameter(protocol in protocol_strategy(), pick in any::<prop::sample::Index>()) {
        let params: Vec<(&str, &str)> = protocol
            .sequences()
            .iter()
            .flat_map(|s| s.iter().map(move |p| (s.name(), p.name())))
            .collect();
        prop_assume!(!params.is_empty());
        let (seq_name, param_name) = params[pick.index(params.len())];
        let picked = |s: &str, p: &Parameter| s == seq_name && p.name() == param_name;

        let reference = rebuild(
            &protocol,
            "reference",
            |_, _| true,
            |s, p| if picked(s, p) { p.clone() } else { p.clone().with_rule(RuleConfig::exact()) },
        );
        let candidate = rebuild(&protocol, "candidate", |s, p| !picked(s, p), |_, p| p.clone());

        let report = Comparator::new(&RuleRegistry::strict())
            .compare(&reference, &candidate)
            .unwrap();
        prop_assert_eq!(report.len(), 1);
        let deviation = &report.deviations()[0];
        prop_assert_eq!(deviation.kind(), DeviationKind::MissingParameter);
        prop_assert!(deviation.rule().is_none());
        prop_assert_eq!(deviation.location(), format!("{}.{}", seq_name, param_name));
    }
}
