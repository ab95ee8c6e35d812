//! Country name and code normalization.
//!
//! Hosted-payment gateways disagree on how they want countries spelled:
//! some take ISO 3166 alpha-2 codes, some alpha-3, and merchants tend to
//! supply free-text names. This module resolves any of the three forms to
//! the code format a given gateway expects.
//!
//! Resolution is lenient by design: an unrecognized input yields `None`,
//! and the [`Helper`](crate::helper::Helper) passes the original string
//! through unchanged rather than failing the whole form build.

/// Output format for a resolved country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountryFormat {
    /// ISO 3166-1 alpha-2, e.g. `"CA"` (the default for most gateways)
    #[default]
    Alpha2,
    /// ISO 3166-1 alpha-3, e.g. `"CAN"`
    Alpha3,
}

/// `(english name, alpha-2, alpha-3)` rows.
///
/// An illustrative subset of ISO 3166-1 covering the countries the shipped
/// gateways operate in; extend as integrations demand.
const COUNTRIES: &[(&str, &str, &str)] = &[
    ("argentina", "AR", "ARG"),
    ("australia", "AU", "AUS"),
    ("austria", "AT", "AUT"),
    ("belgium", "BE", "BEL"),
    ("brazil", "BR", "BRA"),
    ("bulgaria", "BG", "BGR"),
    ("canada", "CA", "CAN"),
    ("chile", "CL", "CHL"),
    ("china", "CN", "CHN"),
    ("colombia", "CO", "COL"),
    ("croatia", "HR", "HRV"),
    ("cyprus", "CY", "CYP"),
    ("czech republic", "CZ", "CZE"),
    ("denmark", "DK", "DNK"),
    ("estonia", "EE", "EST"),
    ("finland", "FI", "FIN"),
    ("france", "FR", "FRA"),
    ("germany", "DE", "DEU"),
    ("greece", "GR", "GRC"),
    ("hong kong", "HK", "HKG"),
    ("hungary", "HU", "HUN"),
    ("iceland", "IS", "ISL"),
    ("india", "IN", "IND"),
    ("indonesia", "ID", "IDN"),
    ("ireland", "IE", "IRL"),
    ("israel", "IL", "ISR"),
    ("italy", "IT", "ITA"),
    ("japan", "JP", "JPN"),
    ("latvia", "LV", "LVA"),
    ("lithuania", "LT", "LTU"),
    ("luxembourg", "LU", "LUX"),
    ("malaysia", "MY", "MYS"),
    ("malta", "MT", "MLT"),
    ("mexico", "MX", "MEX"),
    ("netherlands", "NL", "NLD"),
    ("new zealand", "NZ", "NZL"),
    ("norway", "NO", "NOR"),
    ("peru", "PE", "PER"),
    ("philippines", "PH", "PHL"),
    ("poland", "PL", "POL"),
    ("portugal", "PT", "PRT"),
    ("romania", "RO", "ROU"),
    ("singapore", "SG", "SGP"),
    ("slovakia", "SK", "SVK"),
    ("slovenia", "SI", "SVN"),
    ("south africa", "ZA", "ZAF"),
    ("south korea", "KR", "KOR"),
    ("spain", "ES", "ESP"),
    ("sweden", "SE", "SWE"),
    ("switzerland", "CH", "CHE"),
    ("taiwan", "TW", "TWN"),
    ("thailand", "TH", "THA"),
    ("turkey", "TR", "TUR"),
    ("ukraine", "UA", "UKR"),
    ("united arab emirates", "AE", "ARE"),
    ("united kingdom", "GB", "GBR"),
    ("united states", "US", "USA"),
    ("uruguay", "UY", "URY"),
    ("vietnam", "VN", "VNM"),
];

/// Resolves a free-text country name, alpha-2, or alpha-3 code to the
/// requested format.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// Returns `None` when the input matches nothing in the table.
///
/// # Examples
///
/// ```
/// use offsite_payments_rs::country::{resolve, CountryFormat};
///
/// assert_eq!(resolve("Canada", CountryFormat::Alpha2), Some("CA"));
/// assert_eq!(resolve("ca", CountryFormat::Alpha3), Some("CAN"));
/// assert_eq!(resolve("CAN", CountryFormat::Alpha2), Some("CA"));
/// assert_eq!(resolve("Atlantis", CountryFormat::Alpha2), None);
/// ```
pub fn resolve(input: &str, format: CountryFormat) -> Option<&'static str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    COUNTRIES
        .iter()
        .find(|(name, a2, a3)| {
            *name == needle || a2.to_lowercase() == needle || a3.to_lowercase() == needle
        })
        .map(|(_, a2, a3)| match format {
            CountryFormat::Alpha2 => *a2,
            CountryFormat::Alpha3 => *a3,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(resolve("United States", CountryFormat::Alpha2), Some("US"));
        assert_eq!(resolve("united kingdom", CountryFormat::Alpha3), Some("GBR"));
    }

    #[test]
    fn test_resolve_by_alpha2() {
        assert_eq!(resolve("DE", CountryFormat::Alpha2), Some("DE"));
        assert_eq!(resolve("de", CountryFormat::Alpha3), Some("DEU"));
    }

    #[test]
    fn test_resolve_by_alpha3() {
        assert_eq!(resolve("NLD", CountryFormat::Alpha2), Some("NL"));
        assert_eq!(resolve("nld", CountryFormat::Alpha3), Some("NLD"));
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(resolve("  Canada  ", CountryFormat::Alpha2), Some("CA"));
    }

    #[test]
    fn test_unrecognized_returns_none() {
        assert_eq!(resolve("Atlantis", CountryFormat::Alpha2), None);
        assert_eq!(resolve("", CountryFormat::Alpha2), None);
        assert_eq!(resolve("  ", CountryFormat::Alpha3), None);
    }
}
