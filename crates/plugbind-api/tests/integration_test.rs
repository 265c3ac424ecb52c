//! Integration tests for plugbind-api.

use plugbind_api::{
    at_least, ArrayRef, BindingError, Capability, Command, DataRef, DiagnosticKind, InMemoryHost,
    LogLevel, Outcome, OwnedEntry, Phase, PluginContext, Value,
};
use plugbind_runtime::PluginManifest;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn setup() -> (Arc<InMemoryHost>, PluginContext) {
    let host = Arc::new(InMemoryHost::new());
    let ctx = PluginContext::new(host.clone(), PluginManifest::new("test.integration", "Integration"));
    (host, ctx)
}

#[test]
fn test_resolved_name_is_looked_up_once() {
    let (host, ctx) = setup();
    host.define("sim/altitude", Value::Double(1500.0), false);

    let altitude: DataRef<f64> = DataRef::read_only(&ctx, "sim/altitude");
    assert_eq!(host.lookup_count("sim/altitude"), 0);

    for _ in 0..5 {
        assert_eq!(altitude.read(), 1500.0);
    }
    assert!(altitude.is_resolved());
    assert_eq!(host.lookup_count("sim/altitude"), 1);
}

#[test]
fn test_unresolved_name_retries_until_defined() {
    let (host, ctx) = setup();
    let late: DataRef<i32> = DataRef::read_only(&ctx, "sim/late");

    assert_eq!(late.read(), 0);
    assert_eq!(late.read(), 0);
    assert!(!late.is_resolved());
    assert_eq!(
        ctx.diagnostics()
            .count(DiagnosticKind::ResolutionFailure, "sim/late"),
        2
    );

    host.define("sim/late", Value::Int(4), false);
    assert_eq!(late.read(), 4);
    assert_eq!(host.lookup_count("sim/late"), 3);
    assert_eq!(late.read(), 4);
    assert_eq!(host.lookup_count("sim/late"), 3);
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let (host, ctx) = setup();
    host.define("sim/flaps", Value::Float(0.5), true);

    let wrong: DataRef<i32> = DataRef::read_write(&ctx, "sim/flaps");
    assert_eq!(wrong.read(), 0);
    assert!(matches!(
        wrong.write(1),
        Err(BindingError::KindMismatch { .. })
    ));
    assert_eq!(host.peek("sim/flaps"), Some(Value::Float(0.5)));
}

#[test]
fn test_owned_scalar_round_trip() {
    let (host, ctx) = setup();
    let entry: OwnedEntry<f64> =
        OwnedEntry::new(&ctx, "app/distance", Capability::ReadWrite, false).unwrap();

    entry.set(12.25);
    assert_eq!(host.invoke_get("app/distance"), Some(Value::Double(12.25)));

    assert!(host.invoke_set("app/distance", Value::Double(3.5)));
    assert_eq!(entry.get(), 3.5);
}

#[test]
fn test_owned_array_round_trip() {
    let (host, ctx) = setup();
    let entry: OwnedEntry<Vec<f32>> =
        OwnedEntry::new(&ctx, "app/weights", Capability::ReadWrite, false).unwrap();

    entry.set(vec![1.0, 2.0, 3.0]);
    assert_eq!(
        host.invoke_get("app/weights"),
        Some(Value::FloatArray(vec![1.0, 2.0, 3.0]))
    );

    let weights: ArrayRef<f32> = ArrayRef::read_write(&ctx, "app/weights");
    weights.write_range(1, &[9.0]).unwrap();
    assert_eq!(entry.get(), vec![1.0, 9.0, 3.0]);
}

#[test]
fn test_read_only_write_never_reaches_host() {
    let (host, ctx) = setup();
    host.define("sim/ias", Value::Float(120.0), true);
    host.define("sim/engines", Value::IntArray(vec![1, 1]), true);

    let ias: DataRef<f32> = DataRef::read_only(&ctx, "sim/ias");
    let engines: ArrayRef<i32> = ArrayRef::read_only(&ctx, "sim/engines");

    assert!(matches!(
        ias.write(0.0),
        Err(BindingError::CapabilityViolation(_))
    ));
    assert!(matches!(
        engines.write(&[0, 0]),
        Err(BindingError::CapabilityViolation(_))
    ));
    assert_eq!(host.write_count(), 0);
    assert_eq!(host.peek("sim/ias"), Some(Value::Float(120.0)));
    assert_eq!(
        ctx.diagnostics().total(DiagnosticKind::CapabilityViolation),
        2
    );
}

#[test]
fn test_array_bounds() {
    let (host, ctx) = setup();
    host.define("sim/bytes", Value::ByteArray(vec![10, 20, 30, 40]), true);
    let bytes: ArrayRef<u8> = ArrayRef::read_write(&ctx, "sim/bytes");

    assert_eq!(bytes.len(), Some(4));
    assert_eq!(bytes.read_range(1, 3).unwrap(), vec![20, 30, 40]);
    assert_eq!(bytes.read_range(4, 0).unwrap(), Vec::<u8>::new());

    assert!(matches!(
        bytes.read_range(2, 3),
        Err(BindingError::ArrayBounds { length: 4, .. })
    ));
    assert!(matches!(
        bytes.read_range(usize::MAX, 2),
        Err(BindingError::ArrayBounds { .. })
    ));
    assert!(bytes.write_range(3, &[1, 2]).is_err());
    assert_eq!(host.write_count(), 0);
    assert_eq!(
        ctx.diagnostics().count(DiagnosticKind::ArrayBounds, "sim/bytes"),
        3
    );
}

#[test]
fn test_action_phase_sequencing() {
    let (host, ctx) = setup();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let command = Command::new(&ctx, "app/trim", "Trim", false, move |phase: Phase| {
        recorded.lock().unwrap().push(phase);
        Outcome::Pass
    })
    .unwrap();

    host.issue_phase("app/trim", Phase::Continue);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(
        ctx.diagnostics()
            .count(DiagnosticKind::ProtocolViolation, "app/trim"),
        1
    );

    for phase in [Phase::Begin, Phase::Continue, Phase::Continue, Phase::End] {
        host.issue_phase("app/trim", phase);
    }
    assert_eq!(
        *calls.lock().unwrap(),
        vec![Phase::Begin, Phase::Continue, Phase::Continue, Phase::End]
    );
    assert_eq!(command.state(), plugbind_api::ActionState::Idle);
}

#[test]
fn test_duplicate_owned_entry() {
    let (host, ctx) = setup();
    let first: OwnedEntry<i32> =
        OwnedEntry::new(&ctx, "app/mode", Capability::ReadWrite, false).unwrap();
    let second: Result<OwnedEntry<i32>, BindingError> =
        OwnedEntry::new(&ctx, "app/mode", Capability::ReadWrite, false);

    assert!(matches!(second, Err(BindingError::Registration { .. })));

    first.set(2);
    assert_eq!(host.invoke_get("app/mode"), Some(Value::Int(2)));
    assert!(host.invoke_set("app/mode", Value::Int(3)));
    assert_eq!(first.get(), 3);
}

#[test]
fn test_end_to_end_scenario() {
    let (host, ctx) = setup();
    host.define("speed/ias", Value::Float(120.0), false);

    let airspeed: DataRef<f32> = DataRef::read_only(&ctx, "speed/ias");
    assert_eq!(airspeed.read(), 120.0);

    let threshold: OwnedEntry<f32> =
        OwnedEntry::new(&ctx, "app/threshold", Capability::ReadWrite, true).unwrap();
    threshold.set(80.0);
    assert_eq!(host.published(), vec!["app/threshold".to_string()]);
    assert_eq!(host.invoke_get("app/threshold"), Some(Value::Float(80.0)));
    assert!(at_least(&airspeed, &threshold));

    assert!(host.invoke_set("app/threshold", Value::Float(95.0)));
    assert_eq!(threshold.get(), 95.0);

    // Other consumers see the owned entry through ordinary typed reads.
    let seen: DataRef<f32> = DataRef::read_only(&ctx, "app/threshold");
    assert_eq!(seen.read(), 95.0);
    assert!(at_least(&airspeed, &seen));
    assert!(!at_least(&seen, &airspeed));
}

#[test]
fn test_paths_resolve_against_host_working_dir() {
    let temp_dir = TempDir::new().unwrap();
    let host = Arc::new(InMemoryHost::with_working_dir(temp_dir.path()));
    let ctx = PluginContext::new(host, PluginManifest::new("test.paths", "Paths"));

    let log_path = ctx.paths().resolve("Output/plugin.log");
    assert_eq!(log_path, temp_dir.path().join("Output/plugin.log"));

    ctx.log(LogLevel::Info, "paths resolved");
    assert!(ctx.diagnostics().is_empty());
}
