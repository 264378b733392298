//! Annotation validation: parse the provider's document annotation into the
//! typed invoice model.
//!
//! The document annotation arrives as a JSON string. Deserialisation into
//! [`Invoice`] enforces the structural contract (required fields, field
//! types); a handful of semantic checks cover what the type system cannot
//! express, such as work-item id uniqueness within the chunk. All errors
//! are collected into plain strings so the caller can log the full list in
//! one place; a violation makes the chunk unusable but never aborts the
//! rest of the document.

use crate::invoice::Invoice;

/// Parse and validate a document-annotation JSON string.
///
/// Returns the invoice on success, or every violation found on failure.
pub fn parse_document_annotation(raw: &str) -> Result<Invoice, Vec<String>> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return Err(vec![format!("document annotation is not valid JSON: {e}")]),
    };

    let invoice: Invoice = match serde_json::from_value(value) {
        Ok(invoice) => invoice,
        Err(e) => return Err(vec![format!("document annotation does not match the invoice schema: {e}")]),
    };

    let errors = semantic_errors(&invoice);
    if errors.is_empty() {
        Ok(invoice)
    } else {
        Err(errors)
    }
}

/// Checks beyond the structural schema.
fn semantic_errors(invoice: &Invoice) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for item in &invoice.work_lists {
        if item.id == 0 {
            errors.push(format!(
                "work item id must be 1-based, got 0 (employee '{}')",
                item.employee
            ));
        } else if !seen_ids.insert(item.id) {
            errors.push(format!("work item id {} is not unique within the chunk", item.id));
        }

        if item.employee.trim().is_empty() {
            errors.push(format!("work item {} has an empty employee field", item.id));
        }

        if item.page_number == 0 {
            errors.push(format!("work item {} has page number 0; pages are 1-based", item.id));
        }
    }

    errors
}
