//! Human-readable instance names, e.g. `m5.2xlarge` -> `M5 General Purpose
//! Double Extra Large`.

pub type FamilyNames = &'static [(&'static str, &'static str)];

pub const EC2_FAMILIES: FamilyNames = &[
    ("c1", "C1 High-CPU"),
    ("c3", "C3 High-CPU"),
    ("c4", "C4 High-CPU"),
    ("c5", "C5 High-CPU"),
    ("c5d", "C5 High-CPU"),
    ("cc2", "Cluster Compute"),
    ("cg1", "Cluster GPU"),
    ("cr1", "High Memory Cluster"),
    ("g4", "G4 Accelerated Computing"),
    ("hi1", "HI1. High I/O"),
    ("hs1", "High Storage"),
    ("i3", "I3 High I/O"),
    ("m1", "M1 General Purpose"),
    ("m2", "M2 High Memory"),
    ("m3", "M3 General Purpose"),
    ("m4", "M4 General Purpose"),
    ("m5", "M5 General Purpose"),
    ("m5d", "M5 General Purpose"),
    ("p2", "General Purpose GPU"),
    ("r3", "R3 High-Memory"),
    ("r4", "R4 High-Memory"),
    ("x1", "X1 Extra High-Memory"),
];

pub const RDS_FAMILIES: FamilyNames = &[
    ("t4g", "T4g General Purpose Graviton"),
    ("t3", "T3 General Purpose"),
    ("t2", "T2 General Purpose"),
    ("m6g", "M6g General Purpose Graviton"),
    ("m5", "M5 General Purpose"),
    ("m4", "M4 General Purpose"),
    ("r6g", "R6g Memory optimized Graviton"),
    ("r5", "R5 Memory optimized"),
    ("r4", "R4 Memory optimized"),
    ("x2g", "X2g Memory optimized Graviton"),
];

pub const CACHE_FAMILIES: FamilyNames = &[
    ("t4g", "T4g General Purpose Graviton"),
    ("t3", "T3 General Purpose"),
    ("t2", "T2 General Purpose"),
    ("t1", "T1 Previous generation: (not recommended)"),
    ("m6g", "M6g General Purpose Graviton"),
    ("m5", "M5 General Purpose"),
    ("m4", "M4 General Purpose"),
    ("m3", "M3 Previous generation: (not recommended)"),
    ("m2", "M2 General Purpose"),
    ("m1", "M1 Previous generation: (not recommended)"),
    ("r6gd", "R6gd Memory optimized (SSD storage)"),
    ("r6g", "R6g Memory optimized"),
    ("r5", "R5 Memory optimized"),
    ("r4", "R4 Memory optimized"),
    ("r3", "R3 Memory optimized (not recommended)"),
    ("c1", "C1 Compute optimized (not recommended)"),
];

pub const REDSHIFT_FAMILIES: FamilyNames = &[
    ("dc2", "Dense Compute DC2"),
    ("ra3", "Managed Storage"),
    ("dc1", "Dense Compute"),
    ("ds1", "Dense Storage"),
    ("ds2", "Dense Storage DS2"),
];

pub const OPENSEARCH_FAMILIES: FamilyNames = &[
    ("t2", "T2 General Purpose"),
    ("t3", "T3 General Purpose"),
    ("m5", "M5 General Purpose"),
    ("m6g", "M6g General Purpose Graviton"),
    ("c5", "C5 Compute optimized"),
    ("c6g", "C6g Compute optimized Graviton"),
    ("r5", "R5 Memory optimized"),
    ("r6g", "R6g Memory optimized Graviton"),
    ("r6gd", "R6gd Memory optimized (SSD storage)"),
    ("i3", "I3 Storage optimized"),
    ("or1", "OR1 OpenSearch optimized"),
    ("ultrawarm1", "UltraWarm"),
];

pub const SAGEMAKER_FAMILIES: FamilyNames = &[
    ("t3", "T3 General Purpose"),
    ("m5", "M5 General Purpose"),
    ("c5", "C5 Compute optimized"),
    ("r5", "R5 Memory optimized"),
    ("p3", "P3 Accelerated Computing"),
    ("p4d", "P4d Accelerated Computing"),
    ("g4dn", "G4dn Accelerated Computing"),
    ("g5", "G5 Accelerated Computing"),
    ("inf1", "Inf1 Inferentia"),
    ("trn1", "Trn1 Trainium"),
];

const SERVICE_PREFIXES: &[&str] = &["db.", "cache.", "ml."];

/// Size prefixes that spell out as `<word> Extra Large`
const SIZE_WORDS: &[(&str, &str)] = &[
    ("10x", "Deca"),
    ("8x", "Eight"),
    ("4x", "Quadruple"),
    ("2x", "Double"),
    ("x", ""),
];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Pretty name for an AWS instance type. Types without a size yield `None`.
pub fn pretty_name(instance_type: &str, families: FamilyNames) -> Option<String> {
    let stripped = SERVICE_PREFIXES
        .iter()
        .find_map(|prefix| instance_type.strip_prefix(prefix))
        .unwrap_or(instance_type);
    let stripped = stripped.strip_suffix(".search").unwrap_or(stripped);

    let (family, size) = stripped.split_once('.')?;
    let prefix = families
        .iter()
        .find(|(name, _)| *name == family)
        .map_or_else(|| family.to_uppercase(), |(_, label)| (*label).to_string());

    let mut bits = vec![prefix];
    match SIZE_WORDS
        .iter()
        .find(|(size_prefix, _)| size.starts_with(size_prefix) && size.ends_with("large"))
    {
        Some((_, word)) => {
            bits.push((*word).to_string());
            bits.push("Extra".to_string());
            bits.push("Large".to_string());
        }
        None => bits.push(capitalize(size)),
    }

    Some(
        bits.into_iter()
            .filter(|bit| !bit.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// `Standard_D2s_v3` -> `Standard D2s v3`
pub fn azure_pretty_name(sku_name: &str) -> String {
    sku_name.replace('_', " ")
}
