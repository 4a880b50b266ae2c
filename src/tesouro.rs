//! Tesouro Direto naming conventions
//!
//! Fixed-income positions are keyed by free-text asset names. Government bonds
//! are recognized from the name; Tesouro Selic is the one security type that
//! is tracked as quotas rather than as compounding lots.

/// Government bond family, as read from an asset name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondType {
    Selic,
    Ipca,
    Igpm,
    Prefixado,
    Renda,
    Educa,
}

/// Detect the Tesouro Direto bond type of an asset name, if it is one
pub fn bond_type(name: &str) -> Option<BondType> {
    let normalized = name.trim().to_ascii_lowercase();
    if !normalized.contains("tesouro") {
        return None;
    }
    if normalized.contains("ipca") {
        return Some(BondType::Ipca);
    }
    if normalized.contains("igpm") {
        return Some(BondType::Igpm);
    }
    if normalized.contains("selic") {
        return Some(BondType::Selic);
    }
    if normalized.contains("prefixado") {
        return Some(BondType::Prefixado);
    }
    if normalized.contains("renda") {
        return Some(BondType::Renda);
    }
    if normalized.contains("educa") {
        return Some(BondType::Educa);
    }
    None
}

/// Quota-tracked assets take the event-sequenced balance path
pub fn is_quota_based(name: &str) -> bool {
    bond_type(name) == Some(BondType::Selic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selic_is_quota_based() {
        assert!(is_quota_based("Tesouro Selic 2027"));
        assert!(is_quota_based("TESOURO SELIC 2029"));
        assert!(is_quota_based("Meu Tesouro Selic"));
    }

    #[test]
    fn test_other_bonds_compound_as_lots() {
        assert!(!is_quota_based("Tesouro IPCA+ 2035"));
        assert!(!is_quota_based("Tesouro Prefixado 2026"));
        assert!(!is_quota_based("CDB Banco Inter"));
        assert!(!is_quota_based("LCI Selic Plus"));
    }

    #[test]
    fn test_bond_type_detection() {
        assert_eq!(bond_type("Tesouro IPCA+ com Juros Semestrais 2035"), Some(BondType::Ipca));
        assert_eq!(bond_type("Tesouro IGPM+ com Juros Semestrais 2031"), Some(BondType::Igpm));
        assert_eq!(bond_type("Tesouro Renda+ Aposentadoria Extra 2030"), Some(BondType::Renda));
        assert_eq!(bond_type("Tesouro Educa+ 2029"), Some(BondType::Educa));
        assert_eq!(bond_type("CDB XP 120% CDI"), None);
    }
}
