use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static GENERAL_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(IR|ER)[\s_-]?(\d{4,5})").expect("general job key pattern compiles")
});

static INGEST_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)IR[\s_-]?(\d{5})").expect("ingest job key pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey(String);

impl JobKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches_folder_name(&self, folder_name: &str) -> bool {
        folder_name.to_uppercase().contains(&self.0)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn extract_job_key(text: &str) -> Option<JobKey> {
    let caps = GENERAL_KEY.captures(text)?;
    let prefix = caps.get(1)?.as_str().to_ascii_uppercase();
    let digits = caps.get(2)?.as_str();
    Some(JobKey(format!("{prefix}{digits}")))
}

/// Stricter inbox variant: `IR` with exactly five digits.
pub fn extract_ingest_key(filename: &str) -> Option<JobKey> {
    let caps = INGEST_KEY.captures(filename)?;
    Some(JobKey(format!("IR{}", caps.get(1)?.as_str())))
}

pub fn is_trigger_document(filename: &str, prefixes: &[String]) -> bool {
    let name = filename.to_uppercase();
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
}

pub fn ledger_key(input: &str) -> String {
    match extract_job_key(input) {
        Some(key) => key.0,
        None => input.trim().to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["OUT_OF_CHARGE_IR_".to_string(), "OUT OF CHARGE_IR_".to_string()]
    }

    #[test]
    fn ingest_key_ignores_separator_and_case() {
        for name in [
            "Invoice_IR_00451.pdf",
            "invoice-ir-00451.pdf",
            "Invoice IR 00451.pdf",
            "INVOICE_IR00451.PDF",
            "bill_Ir_00451_final.pdf",
        ] {
            assert_eq!(
                extract_ingest_key(name).map(|k| k.to_string()),
                Some("IR00451".to_string()),
                "{name}"
            );
        }
    }

    #[test]
    fn ingest_key_requires_ir_and_five_digits() {
        assert_eq!(extract_ingest_key("Invoice_ER_00451.pdf"), None);
        assert_eq!(extract_ingest_key("Invoice_IR_0451.pdf"), None);
        assert_eq!(extract_ingest_key("Invoice.pdf"), None);
    }

    #[test]
    fn general_key_accepts_er_and_four_digits() {
        assert_eq!(
            extract_job_key("Packing_List_er-1234.docx").map(|k| k.to_string()),
            Some("ER1234".to_string())
        );
        assert_eq!(
            extract_job_key("Packing_List_IR00451.docx").map(|k| k.to_string()),
            Some("IR00451".to_string())
        );
        assert_eq!(extract_job_key("Packing_List.docx"), None);
    }

    #[test]
    fn general_key_takes_first_match() {
        let key = extract_job_key("IR_1111 then ER_2222").expect("key");
        assert_eq!(key.as_str(), "IR1111");
    }

    #[test]
    fn trigger_is_prefix_not_substring() {
        let p = prefixes();
        assert!(is_trigger_document("OUT_OF_CHARGE_IR_12345.pdf", &p));
        assert!(is_trigger_document("Out_of_Charge_IR_00451.pdf", &p));
        assert!(is_trigger_document("Out of Charge_IR_00451.pdf", &p));
        assert!(!is_trigger_document("INBOUND_OOC_OUT_OF_CHARGE_IR_12345.pdf", &p));
        assert!(!is_trigger_document("Invoice_IR_00451.pdf", &p));
    }

    #[test]
    fn folder_match_is_case_insensitive() {
        let key = extract_job_key("IR00451").expect("key");
        assert!(key.matches_folder_name("ir00451 - BMW"));
        assert!(!key.matches_folder_name("IR00452"));
    }

    #[test]
    fn ledger_key_falls_back_to_raw_name() {
        assert_eq!(ledger_key("ir_00451 - bmw"), "IR00451");
        assert_eq!(ledger_key(" misc job "), "MISC JOB");
    }
}
