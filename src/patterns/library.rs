// SPDX-License-Identifier: PMPL-1.0-or-later

//! Known smart-contract weakness patterns
//!
//! Each entry is data only. Matching and confidence adjustment live in
//! `PatternLibrary`.

use crate::types::Severity;

#[derive(Debug, Clone)]
pub struct VulnerabilityPattern {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub category: &'static str,
    pub regex: &'static str,
    pub recommendation: &'static str,
    pub cwe_id: Option<&'static str>,
    pub swc_id: Option<&'static str>,
    pub base_confidence: f64,
}

pub static PATTERNS: &[VulnerabilityPattern] = &[
    VulnerabilityPattern {
        id: "tx-origin",
        name: "Authorization through tx.origin",
        description: "tx.origin is the externally owned account that started the transaction. \
                      Authorizing on it lets any contract the owner calls act with the owner's rights.",
        severity: Severity::High,
        category: "access-control",
        regex: r"\btx\.origin\b",
        recommendation: "Use msg.sender for authorization checks.",
        cwe_id: Some("CWE-477"),
        swc_id: Some("SWC-115"),
        base_confidence: 0.75,
    },
    VulnerabilityPattern {
        id: "floating-pragma",
        name: "Floating Pragma",
        description: "The compiler version is not locked, so the contract may be deployed with \
                      a compiler it was never tested against.",
        severity: Severity::Low,
        category: "configuration",
        regex: r"pragma\s+solidity\s*(?:\^|>=?)",
        recommendation: "Lock the pragma to the exact compiler version used in testing.",
        cwe_id: Some("CWE-664"),
        swc_id: Some("SWC-103"),
        base_confidence: 0.9,
    },
    VulnerabilityPattern {
        id: "outdated-compiler",
        name: "Outdated Compiler Version",
        description: "The pragma targets a compiler release with known bugs and without \
                      built-in overflow checks.",
        severity: Severity::Low,
        category: "configuration",
        regex: r"pragma\s+solidity\s*[\^~>=<]*\s*0\.[4-7]\.\d+",
        recommendation: "Upgrade to a current 0.8.x compiler release.",
        cwe_id: Some("CWE-937"),
        swc_id: Some("SWC-102"),
        base_confidence: 0.85,
    },
    VulnerabilityPattern {
        id: "unchecked-call",
        name: "Unchecked Low-Level Call",
        description: "The return value of a low-level call is discarded; a failed call will \
                      not revert the transaction.",
        severity: Severity::Medium,
        category: "unchecked-return",
        regex: r"(?m)^\s*(?:payable\([^)]*\)|[A-Za-z_][\w\.\[\]]*)\.(?:call|send|delegatecall|staticcall)\s*(?:\{[^}]*\})?\s*\([^;]*\)\s*;",
        recommendation: "Check the returned success flag, or use a wrapper that reverts on failure.",
        cwe_id: Some("CWE-252"),
        swc_id: Some("SWC-104"),
        base_confidence: 0.7,
    },
    VulnerabilityPattern {
        id: "weak-randomness",
        name: "Weak Source of Randomness",
        description: "Randomness is derived from block attributes that miners and validators \
                      can predict or influence.",
        severity: Severity::Medium,
        category: "randomness",
        regex: r"keccak256\s*\([^;]*\b(?:block\.timestamp|block\.difficulty|block\.prevrandao|blockhash|block\.number|now)\b",
        recommendation: "Use a verifiable randomness source such as a VRF oracle or commit-reveal.",
        cwe_id: Some("CWE-330"),
        swc_id: Some("SWC-120"),
        base_confidence: 0.8,
    },
    VulnerabilityPattern {
        id: "deprecated-construct",
        name: "Use of Deprecated Functions",
        description: "A deprecated Solidity construct is used; it is removed or behaves \
                      differently in current compilers.",
        severity: Severity::Low,
        category: "best-practice",
        regex: r"\b(?:suicide|sha3|callcode)\s*\(|\bthrow\s*;|\bmsg\.gas\b|\bblock\.blockhash\b",
        recommendation: "Replace with selfdestruct, keccak256, delegatecall, revert(), gasleft() or blockhash().",
        cwe_id: Some("CWE-477"),
        swc_id: Some("SWC-111"),
        base_confidence: 0.9,
    },
    VulnerabilityPattern {
        id: "timestamp",
        name: "Timestamp Dependence",
        description: "Control flow depends on the block timestamp, which the block producer \
                      can shift within a tolerance.",
        severity: Severity::Low,
        category: "time-manipulation",
        regex: r"\bblock\.timestamp\b|\bnow\b",
        recommendation: "Do not rely on block.timestamp for randomness or for precision below ~15 seconds.",
        cwe_id: Some("CWE-829"),
        swc_id: Some("SWC-116"),
        base_confidence: 0.45,
    },
    VulnerabilityPattern {
        id: "inline-assembly",
        name: "Inline Assembly Usage",
        description: "Inline assembly bypasses compiler safety checks.",
        severity: Severity::Info,
        category: "best-practice",
        regex: r"\bassembly\s*(?:\([^)]*\)\s*)?\{",
        recommendation: "Keep assembly blocks minimal and document their invariants.",
        cwe_id: Some("CWE-695"),
        swc_id: None,
        base_confidence: 0.9,
    },
    VulnerabilityPattern {
        id: "signature-malleability",
        name: "Signature Malleability",
        description: "ecrecover accepts malleable signatures and returns address(0) on failure.",
        severity: Severity::Medium,
        category: "cryptography",
        regex: r"\becrecover\s*\(",
        recommendation: "Use a vetted ECDSA library that rejects high-s values and zero addresses.",
        cwe_id: Some("CWE-347"),
        swc_id: Some("SWC-117"),
        base_confidence: 0.55,
    },
    VulnerabilityPattern {
        id: "uninitialized-storage",
        name: "Uninitialized Storage Pointer",
        description: "A local storage pointer is declared without initialization and aliases \
                      slot zero.",
        severity: Severity::High,
        category: "storage",
        regex: r"\b[A-Za-z_]\w*(?:\[\])?\s+storage\s+[A-Za-z_]\w*\s*;",
        recommendation: "Initialize storage pointers on declaration or use memory.",
        cwe_id: Some("CWE-824"),
        swc_id: Some("SWC-109"),
        base_confidence: 0.6,
    },
    VulnerabilityPattern {
        id: "unbounded-loop",
        name: "Unbounded Loop",
        description: "A loop iterates over a dynamically sized array; enough elements push the \
                      call over the block gas limit.",
        severity: Severity::Medium,
        category: "denial-of-service",
        regex: r"for\s*\([^;]*;\s*[A-Za-z_]\w*\s*<=?\s*[A-Za-z_][\w\.\[\]]*\.length",
        recommendation: "Bound the iteration count or process the array in batches.",
        cwe_id: Some("CWE-400"),
        swc_id: Some("SWC-128"),
        base_confidence: 0.6,
    },
];
