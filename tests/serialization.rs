mod common;

use common::{FATAL_OUTPUT, KARMA_FAILURE_OUTPUT, PROGRESS_OUTPUT, SUMMARY_OUTPUT, TestResult, build_calculator, mock_fs};
use proptest::prelude::*;
use runboard::registry::SerializedCommand;
use runboard::status::{
    BuildDetailedStatus, DetailedStatus, DetailedStatusCalculator, TestDetailedStatus,
    TestStatusCalculator,
};
use runboard::types::{CommandKind, CommandStatus};

fn round_trip(status: &DetailedStatus) -> Result<DetailedStatus, serde_json::Error> {
    serde_json::from_str(&serde_json::to_string(status)?)
}

#[test]
fn build_states_survive_json() -> TestResult {
    let (_mock, fs) = mock_fs();
    let mut calc = build_calculator(fs, Some("dist/app"));

    for chunk in [PROGRESS_OUTPUT, SUMMARY_OUTPUT, "ERROR in src/x.ts\n  open block\n", FATAL_OUTPUT] {
        calc.add_out(chunk)?;
        let status = calc.detailed_status().ok_or("no detailed status")?;
        assert_eq!(round_trip(&status)?, status);
    }
    Ok(())
}

#[test]
fn test_states_survive_json() -> TestResult {
    let mut calc = TestStatusCalculator::new();

    for chunk in [
        "ERROR in src/app.spec.ts\n\n",
        "Executed 0 of 0 SUCCESS\n",
        "Executed 0 of 0 ERROR\n",
        KARMA_FAILURE_OUTPUT,
        "Executed 3 of 4 (1 FAILED)\n",
    ] {
        calc.add_out(chunk)?;
        let status = calc.detailed_status().ok_or("no detailed status")?;
        assert_eq!(round_trip(&status)?, status);
    }
    Ok(())
}

#[test]
fn detailed_status_is_tagged_and_camel_cased() -> TestResult {
    let (_mock, fs) = mock_fs();
    let mut calc = build_calculator(fs, None);
    calc.add_out(SUMMARY_OUTPUT)?;

    let json = serde_json::to_value(calc.detailed_status().ok_or("no detailed status")?)?;
    assert_eq!(json["type"], "build");
    assert_eq!(json["buildStatus"], "success");
    assert_eq!(json["progress"], 100);
    assert_eq!(json["chunks"][0]["type"], "initial");
    assert!(json.get("capturingErrors").is_none());
    Ok(())
}

#[test]
fn serialized_command_uses_wire_names() -> TestResult {
    let command = SerializedCommand {
        id: "ng build 0".to_string(),
        kind: CommandKind::Ng,
        workspace: Some("app".to_string()),
        command: "/usr/bin/ng build".to_string(),
        status: CommandStatus::InProgress,
        out: "abc".to_string(),
        out_chunk: "c".to_string(),
        detailed_status: None,
    };

    let json = serde_json::to_value(&command)?;
    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["kind"], "ng");
    assert_eq!(json["outChunk"], "c");
    assert!(json.get("detailedStatus").is_none());

    let back: SerializedCommand = serde_json::from_value(json)?;
    assert_eq!(back, command);
    Ok(())
}

const FRAGMENTS: &[&str] = &[
    PROGRESS_OUTPUT,
    SUMMARY_OUTPUT,
    FATAL_OUTPUT,
    KARMA_FAILURE_OUTPUT,
    "ERROR in ",
    "Executed 2 of 4 SUCCESS\n",
    "Executed 4 of 4 (1 FAILED)\n",
    "Executed 0 of 0 SUCCESS\n",
    "Executed 0 of 0 ERROR\n",
    "Connected on socket abc\n",
    "0% compiling\n",
    "Date: 2019-01-01T10:00:00.000Z - Time: 16477ms\n",
    "listening on localhost:4200\n",
    "\u{1b}[32m42%\u{1b}[39m building\r",
    "\n",
];

fn chunk_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
        1 => ".{0,16}",
    ]
}

proptest! {
    #[test]
    fn any_folded_build_state_survives_json(chunks in prop::collection::vec(chunk_strategy(), 0..12)) {
        let mut status = BuildDetailedStatus::default();
        for chunk in &chunks {
            status = status.fold(chunk);
            let wrapped = DetailedStatus::Build(status.clone());
            prop_assert_eq!(round_trip(&wrapped).unwrap(), wrapped);
            let shown = DetailedStatus::Build(status.preview());
            prop_assert_eq!(round_trip(&shown).unwrap(), shown);
        }
    }

    #[test]
    fn any_folded_test_state_survives_json(chunks in prop::collection::vec(chunk_strategy(), 0..12)) {
        let mut status = TestDetailedStatus::default();
        for chunk in &chunks {
            status = status.fold(chunk);
            let wrapped = DetailedStatus::Test(status.clone());
            prop_assert_eq!(round_trip(&wrapped).unwrap(), wrapped);
        }
        status.finalize();
        let finished = DetailedStatus::Test(status);
        prop_assert_eq!(round_trip(&finished).unwrap(), finished);
    }
}
