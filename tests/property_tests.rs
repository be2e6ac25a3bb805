// SPDX-License-Identifier: PMPL-1.0-or-later

//! Line-number properties that hold for every engine

use consensus_scan::engines::{AnalyzerEngine, CustomEngine, MythrilEngine, SlitherEngine};
use proptest::prelude::*;

const SNIPPETS: &[&str] = &[
    "pragma solidity ^0.7.0;",
    "contract P {",
    "uint256 total;",
    "mapping(address => uint256) balances;",
    "function f(uint256 x) public {",
    "total += x;",
    "for (uint256 i = 0; i < x; i++) { total = total + i; }",
    "msg.sender.call{value: x}(\"\");",
    "balances[msg.sender] = 0;",
    "require(tx.origin == msg.sender);",
    "selfdestruct(payable(msg.sender));",
    "uint256 r = total / x;",
    "if (block.timestamp > total) { total = 0; }",
    "// selfdestruct(owner);",
    "/* block.timestamp",
    "*/",
    "assert(total > 0);",
    "do { total += 1; } while (total < 3);",
    "do {",
    "} while (x > 0);",
    "revert(\"not now / later\");",
    "import \"@openzeppelin/contracts/token/ERC20/IERC20.sol\";",
    "if (ok) total = 0;",
    "}",
    "",
];

fn engines() -> Vec<Box<dyn AnalyzerEngine>> {
    vec![
        Box::new(SlitherEngine::new().unwrap()),
        Box::new(MythrilEngine::new().unwrap()),
        Box::new(CustomEngine::new().unwrap()),
    ]
}

proptest! {
    #[test]
    fn selfdestruct_line_matches_prefix(prefix in prop::collection::vec("[a-z ]{0,20}", 0..40)) {
        let mut source = prefix.join("\n");
        if !prefix.is_empty() {
            source.push('\n');
        }
        source.push_str("selfdestruct(payable(msg.sender));\n");

        let result = MythrilEngine::new().unwrap().analyze(&source).unwrap();
        let dos: Vec<_> = result
            .vulnerabilities
            .iter()
            .filter(|v| v.title == "Denial of Service")
            .collect();
        prop_assert_eq!(dos.len(), 1);
        prop_assert_eq!(&dos[0].line_numbers, &vec![prefix.len() + 1]);
    }

    #[test]
    fn line_numbers_are_in_range_and_ascending(
        picks in prop::collection::vec(0..SNIPPETS.len(), 0..30),
        crlf in any::<bool>(),
    ) {
        let separator = if crlf { "\r\n" } else { "\n" };
        let source = picks
            .iter()
            .map(|&i| SNIPPETS[i])
            .collect::<Vec<_>>()
            .join(separator);
        let physical = source.split('\n').count();

        for engine in engines() {
            let result = engine.analyze(&source).unwrap();
            for vuln in &result.vulnerabilities {
                prop_assert!(!vuln.line_numbers.is_empty());
                prop_assert!(vuln.line_numbers.iter().all(|&l| l >= 1 && l <= physical),
                    "{} reported {:?} for {} lines", engine.name(), vuln.line_numbers, physical);
                prop_assert!(vuln.line_numbers.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
