// SPDX-License-Identifier: PMPL-1.0-or-later

//! Engine behavior against the Solidity fixtures

use consensus_scan::engines::{AnalyzerEngine, CustomEngine, MythrilEngine, SlitherEngine};
use consensus_scan::types::*;
use std::fs;
use std::path::Path;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).expect("fixture should be readable")
}

fn find<'a>(result: &'a StaticAnalysisResult, title: &str) -> Vec<&'a Vulnerability> {
    result
        .vulnerabilities
        .iter()
        .filter(|v| v.title == title)
        .collect()
}

#[test]
fn test_selfdestruct_reported_as_critical_denial_of_service() {
    let source = "contract Kill {\n    function kill() public {\n        selfdestruct(msg.sender);\n    }\n}\n";
    let result = MythrilEngine::new().unwrap().analyze(source).unwrap();

    let dos = find(&result, "Denial of Service");
    assert_eq!(dos.len(), 1, "exactly one DoS finding");
    assert_eq!(dos[0].severity, Severity::Critical);
    assert_eq!(dos[0].swc_id.as_deref(), Some("SWC-106"));
    assert_eq!(dos[0].line_numbers, vec![3]);
}

#[test]
fn test_call_then_balance_write_is_reentrancy() {
    let source = "contract Pool {\n    mapping(address => uint256) balances;\n    function pull(uint256 amount) public {\n        token.call{value: amount}(\"\");\n        amount = amount;\n        balances[msg.sender] -= amount;\n    }\n}\n";
    let result = SlitherEngine::new().unwrap().analyze(source).unwrap();

    let reentrancy = find(&result, "Reentrancy");
    assert_eq!(reentrancy.len(), 1);
    assert_eq!(reentrancy[0].severity, Severity::High);
    assert_eq!(reentrancy[0].category, "reentrancy");
    assert_eq!(reentrancy[0].swc_id.as_deref(), Some("SWC-107"));
    assert_eq!(reentrancy[0].line_numbers, vec![4, 6]);
}

#[test]
fn test_vault_fixture_per_engine() {
    let source = fixture("vault.sol");

    let slither = SlitherEngine::new().unwrap().analyze(&source).unwrap();
    assert_eq!(find(&slither, "Reentrancy")[0].line_numbers, vec![10, 12]);
    assert_eq!(find(&slither, "Floating Pragma")[0].line_numbers, vec![2]);
    let origin = find(&slither, "Authorization through tx.origin");
    assert_eq!(origin[0].confidence, Confidence::High);

    let mythril = MythrilEngine::new().unwrap().analyze(&source).unwrap();
    assert_eq!(find(&mythril, "Denial of Service")[0].line_numbers, vec![17]);
    assert_eq!(find(&mythril, "Timestamp Dependence")[0].line_numbers, vec![21]);
    assert!(find(&mythril, "Integer Overflow and Underflow").is_empty());

    let custom = CustomEngine::new().unwrap().analyze(&source).unwrap();
    let events = find(&custom, "Missing Event Emission");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].line_numbers, vec![12]);
    assert!(custom.metrics.gas_estimate.is_some());
    assert_eq!(custom.metrics.functions_analyzed, 3);
}

#[test]
fn test_legacy_fixture_per_engine() {
    let source = fixture("legacy_token.sol");

    let mythril = MythrilEngine::new().unwrap().analyze(&source).unwrap();
    let overflow_lines: Vec<usize> = find(&mythril, "Integer Overflow and Underflow")
        .iter()
        .flat_map(|v| v.line_numbers.clone())
        .collect();
    assert!(overflow_lines.contains(&11));
    assert!(overflow_lines.contains(&12));

    let delegate = find(&mythril, "Delegatecall to Untrusted Callee");
    assert_eq!(delegate.len(), 1, "constant registry target is not reported");
    assert_eq!(delegate[0].line_numbers, vec![26]);
    assert_eq!(delegate[0].severity, Severity::Critical);

    let slither = SlitherEngine::new().unwrap().analyze(&source).unwrap();
    assert_eq!(find(&slither, "Outdated Compiler Version").len(), 1);
    assert_eq!(find(&slither, "Unbounded Loop")[0].line_numbers, vec![16]);
    assert_eq!(find(&slither, "Unchecked Low-Level Call").len(), 2);

    let custom = CustomEngine::new().unwrap().analyze(&source).unwrap();
    assert_eq!(find(&custom, "Storage Write in Loop")[0].line_numbers, vec![16, 17]);
    assert_eq!(find(&custom, "Division by Zero")[0].line_numbers, vec![22]);
    let events: Vec<_> = find(&custom, "Missing Event Emission")
        .iter()
        .map(|v| v.line_numbers.clone())
        .collect();
    assert_eq!(events, vec![vec![11], vec![17]]);
}

#[test]
fn test_clean_fixture_has_no_findings() {
    let source = fixture("counter.sol");
    let engines: Vec<Box<dyn AnalyzerEngine>> = vec![
        Box::new(SlitherEngine::new().unwrap()),
        Box::new(MythrilEngine::new().unwrap()),
        Box::new(CustomEngine::new().unwrap()),
    ];
    for engine in engines {
        let result = engine.analyze(&source).unwrap();
        assert!(
            result.vulnerabilities.is_empty(),
            "{} reported {:?}",
            engine.name(),
            result.vulnerabilities
        );
        assert_eq!(result.metrics.total_lines, 12);
        assert_eq!(result.tool, engine.name());
    }
}

#[test]
fn test_commented_code_is_ignored() {
    let source = "contract C {\n    // selfdestruct(owner);\n    /* tx.origin == owner */\n}\n";
    let result = MythrilEngine::new().unwrap().analyze(source).unwrap();
    assert!(result.vulnerabilities.is_empty());
}

#[test]
fn test_binary_input_is_an_engine_failure() {
    let err = CustomEngine::new().unwrap().analyze("\0\0\x7fELF").unwrap_err();
    assert_eq!(err.kind(), "external_service");
    assert!(err.to_string().starts_with("external service unavailable"));
}
