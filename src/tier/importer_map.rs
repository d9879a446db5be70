use std::collections::BTreeMap;

const BUILTIN_IMPORTERS: &[(&str, &str)] = &[
    ("ABBOTT HEALTHCARE PRIVATE LIMITED", "ABBOTT HEALTHCARE ( IMPORT )"),
    ("ANANDA BALAJI FOODS PRIVATE LIMITED", "ANANDA BALAJI FOODS PV LTD"),
    ("APOLLO HOSPITALS ENTERPRISE LIMITED", "APPOLLO HOSPITAL"),
    (
        "AVIAT NETWORKS (INDIA) PRIVATE LIMITED",
        "AVIAT NETWORKS (INDIA) PRIVATE LIMITED",
    ),
    ("BALAJI WAFERS PRIVATE LIMITED", "BALAJI WAFERS ( IMPORT )"),
    ("BESTEX MM INDIA PRIVATE LIMITED", "BESTEX MM INDIA PVT LTD"),
    ("BLUE STAR ENGINEERING & ELECTRONICS LIMITED", "BLUE STAR"),
    ("BRISTOL-MYERS SQUIBB INDIA PRIVATE LIMITED", "BRISTOL MYERS"),
    ("EDIFICE MEDICAL TECHNOLOGIES", "EDIFICE MEDICAL SYSTEM"),
    (
        "GATEWAY TERMINALS INDIA PRIVATE LIMITED",
        "GATEWAY TERMINALS INDIA PVT LTD",
    ),
    ("GUJARAT PIPAVAV PORT LIMITED", "GUJARAT PIPAVAV"),
    ("JAY MA INTERNATIONAL", "JAY MA INTERNATIONAL"),
    ("KANTILAL CHHOTALAL", "KANTILAL CHHOTALAL"),
    (
        "MEDLINE HEALTHCARE INDUSTRIES PRIVATE LIMITED",
        "MEDLINE HEALTHCARE  PVT LTD ( IMPORT )",
    ),
    ("MUSASHI AUTO PARTS INDIA PRIVATE LIMITED", "MUSASHI AUTO PARTS"),
    ("NILKANTH AGRO TECH", "NILKANTH AGRO TECH"),
    ("SAKET TEX-DYE PVT.LTD.", "SAKET TEX DYE PVT LTD"),
    ("SANCO BESAN MILL", "Sanco Besan Mill"),
    (
        "SIDDHAYU LIFE SCIENCES PRIVATE LIMITED",
        "SIDDHAYU LIFE SCIENCES PVT ITD",
    ),
    (
        "SVAAR PROCESS SOLUTIONS PRIVATE LIMITED",
        "SVAAR PROCESS SOLUTIONS PRIVATE LIMITED",
    ),
    ("URSCHEL INDIA TRADING PRIVATE LIMITED", "URSCHEL INDIA"),
    ("ADVICS INDIA PRIVATE LIMITED", "ADVICS INDIA ( IMPORT )"),
    (
        "ANSELL INDIA PROTECTIVE PRODUCTS PRIVATE LIMITED",
        "ANSELL INDIA PVT LTD ( IMPORT )",
    ),
    (
        "ARJOHUNTLEIGH HEALTHCARE INDIA PRIVATE LIMITED",
        "ARJOHUNTLEIGH HEALTHCARE INDIA PVT LTD",
    ),
    (
        "B.BRAUN MEDICAL (INDIA) PRIVATE LIMITED",
        "B BRAUN MEDICAL ( IMPORT )",
    ),
    ("BMW INDIA PRIVATE LIMITED", "BMW INDIA PVT LTD"),
    ("ESSITY INDIA PRIVATE LIMITED", "ESSITY INDIA ( IMPORT )"),
    ("MAXHILL TECHNOLOGIES", "MAXHILL TECHNOLOGIES"),
    (
        "SKODA AUTO VOLKSWAGEN INDIA PRIVATE LIMITED",
        "SKODA AUTO ( IMPORT )",
    ),
    (
        "TESLA INDIA MOTORS AND ENERGY PRIVATE LIMITED",
        "TESLA INDIA",
    ),
    ("BHARTI AIRTEL LIMITED", "BHARTI AIRTEL"),
    ("DUCATI INDIA PRIVATE LIMITED", "DUCATI INDIA PVT LTD"),
    ("BHARTI HEXACOM LIMITED", "BHARTI HEXACOM LIMITED"),
];

/// Immutable importer table. Keys are upper-cased and kept in match order:
/// longest key first, ties broken lexicographically, so a key that is a
/// substring of a longer key can never shadow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterMap {
    entries: Vec<(String, String)>,
}

impl Default for ImporterMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ImporterMap {
    pub fn builtin() -> Self {
        Self::from_pairs(
            BUILTIN_IMPORTERS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut dedup = BTreeMap::new();
        for (key, destination) in pairs {
            let key = key.trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            dedup.insert(key, destination.trim().to_string());
        }
        let mut entries = dedup.into_iter().collect::<Vec<_>>();
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn find_importer_key(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .map(|(k, _)| k.as_str())
            .find(|key| text.contains(key))
    }

    pub fn destination(&self, importer_key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == importer_key)
            .map(|(_, v)| v.as_str())
    }
}
