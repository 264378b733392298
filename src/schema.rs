//! Annotation response formats sent to the OCR provider.
//!
//! The provider's structured extraction is schema-guided: every request
//! carries a JSON Schema wrapped in a `json_schema` response-format envelope,
//! and the field descriptions double as extraction instructions for the
//! model. Centralising the schemas here keeps the wire contract in one place
//! and lets unit tests inspect it without a live provider.
//!
//! Two formats exist, matching the provider API:
//!
//! * the **document annotation** format — the invoice shape of
//!   [`crate::invoice::Invoice`], applied to the chunk as a whole;
//! * the **bbox/image annotation** format — per-image descriptions, requested
//!   alongside but not consumed by this pipeline.

use serde::Serialize;
use serde_json::{json, Value};

/// A `json_schema` response-format envelope as the provider expects it.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub json_schema: JsonSchemaSpec,
}

/// The named schema inside a [`ResponseFormat`].
#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaSpec {
    pub name: &'static str,
    pub schema_definition: Value,
}

fn response_format(name: &'static str, schema_definition: Value) -> ResponseFormat {
    ResponseFormat {
        kind: "json_schema",
        json_schema: JsonSchemaSpec {
            name,
            schema_definition,
        },
    }
}

/// Response format describing the invoice document annotation.
pub fn document_annotation_format() -> ResponseFormat {
    response_format("document_annotations", invoice_schema())
}

/// Response format describing per-image bbox annotations.
pub fn image_annotation_format() -> ResponseFormat {
    response_format("bbox_annotations", image_schema())
}

/// Decimal-string column: period decimal separator, empty string when the
/// value is not on the page.
fn decimal_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": format!(
            "{description}, as a decimal number using a period as decimal separator. \
             MUST be an empty string if not available"
        ),
    })
}

fn nullable_string(description: &str) -> Value {
    json!({ "type": ["string", "null"], "description": description })
}

fn required_string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn empty_when_missing(description: &str) -> Value {
    json!({
        "type": "string",
        "description": format!("{description}, MUST be an empty string if not available"),
    })
}

/// JSON Schema for one timesheet row.
fn work_item_schema() -> Value {
    json!({
        "type": "object",
        "description": "Create this ONLY when all required fields are present in the OCR result.",
        "properties": {
            "department": nullable_string("Department, unit, or team that performed the work"),
            "employee": required_string("Name of the employee or contractor who performed the work"),
            "project": nullable_string("Project name, project number, or project description tied to the work"),
            "activity": nullable_string("Activity type or work description"),
            "fromPeriod": required_string(
                "Start time of the work period, 'HH:mm'. If the work started on the hour, \
                 set the minutes to '00'. If minutes are unavailable, use 'HH:00'"
            ),
            "toPeriod": required_string(
                "End time of the work period, 'HH:mm'. If the work ended on the hour, \
                 set the minutes to '00'. If minutes are unavailable, use 'HH:00'"
            ),
            "fromDate": required_string(
                "Start date of the work period in DD.MM.YYYY format, from the date field where the work started"
            ),
            "toDate": required_string(
                "End date of the work period in DD.MM.YYYY format. If the end time crosses \
                 midnight (00:00), set this to the next day"
            ),
            "payType": nullable_string("Pay type or pay code tied to the work"),
            "extras": empty_when_missing("Supplement codes and description of supplements"),
            "total": decimal_string(
                "Total hours spent on the work entry. Will never be unreasonably high, always below 100"
            ),
            "machineHours": decimal_string(
                "Machine hours with equipment codes. Will never be unreasonably high, always below 100"
            ),
            "pageNumber": { "type": "number", "description": "Page number in the PDF document where the work entry was found" },
            "id": { "type": "number", "description": "Unique running number starting at 1, incremented by 1 per entry" },
        },
        "required": [
            "department", "employee", "project", "activity",
            "fromPeriod", "toPeriod", "fromDate", "toDate",
            "payType", "extras", "total", "machineHours",
            "pageNumber", "id",
        ],
        "additionalProperties": false,
    })
}

/// JSON Schema for one invoice line item.
fn line_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "productNumber": empty_when_missing("Product number or product code"),
            "description": empty_when_missing("Description of the product or service"),
            "quantity": decimal_string("Number of units of the product or service"),
            "unit": empty_when_missing("Unit for the quantity, e.g. 'pcs', 'kg'"),
            "unitPrice": decimal_string(
                "Price per unit of the product or service. May be written as a whole number \
                 or with a space between each thousand"
            ),
            "totalPrice": decimal_string(
                "Total price for the line item (quantity * unitPrice). May be written as a \
                 whole number or with a space between each thousand"
            ),
        },
        "required": ["productNumber", "description", "quantity", "unit", "unitPrice", "totalPrice"],
        "additionalProperties": false,
    })
}

/// The full invoice document-annotation schema.
///
/// Header/sender/recipient/reference/totals blocks are nullable as a whole:
/// the model is instructed to create each block only when at least one of its
/// fields is present in the OCR result.
fn invoice_schema() -> Value {
    let block_note = "Create this ONLY when at least one field is present in the OCR result.";
    json!({
        "type": "object",
        "properties": {
            "workLists": {
                "type": "array",
                "description": "List of timesheets tied to the invoice. MUST be an empty array if no timesheets are found.",
                "items": work_item_schema(),
            },
            "lineItems": {
                "type": ["array", "null"],
                "description": "List of all products or services on the invoice, may be null if not available",
                "items": line_item_schema(),
            },
            "invoice": {
                "type": ["object", "null"],
                "description": block_note,
                "properties": {
                    "number": nullable_string("Invoice number"),
                    "date": nullable_string("Invoice date in DD.MM.YYYY format"),
                    "dueDate": nullable_string("Due date in DD.MM.YYYY format"),
                    "kid": empty_when_missing("KID payment reference, usually 10 digits"),
                },
                "required": ["number", "date", "dueDate", "kid"],
                "additionalProperties": false,
            },
            "recipient": {
                "type": ["object", "null"],
                "description": block_note,
                "properties": {
                    "name": nullable_string("Recipient organisation or person name"),
                    "streetAddress": nullable_string("Street or PO box address of the recipient"),
                    "postalCode": nullable_string("Postal code of the recipient"),
                    "city": nullable_string("City of the recipient"),
                },
                "required": ["name", "streetAddress", "postalCode", "city"],
                "additionalProperties": false,
            },
            "reference": {
                "type": ["object", "null"],
                "description": block_note,
                "properties": {
                    "ourReference": empty_when_missing("Our reference, contact person at the sender"),
                    "theirReference": empty_when_missing("Their reference or contract number"),
                },
                "required": ["ourReference", "theirReference"],
                "additionalProperties": false,
            },
            "totals": {
                "type": ["object", "null"],
                "description": block_note,
                "properties": {
                    "excludingMva": decimal_string("Total amount excluding VAT"),
                    "mvaAmount": decimal_string("Total VAT amount"),
                    "includingMva": decimal_string("Total amount including VAT"),
                },
                "required": ["excludingMva", "mvaAmount", "includingMva"],
                "additionalProperties": false,
            },
            "sender": {
                "type": ["object", "null"],
                "description": block_note,
                "properties": {
                    "name": empty_when_missing("Sender organisation or person name"),
                    "streetAddress": empty_when_missing("Street or PO box address of the sender"),
                    "orgNumber": empty_when_missing("Organisation number of the sender"),
                    "businessRegistration": empty_when_missing("Business register information"),
                    "euRegistration": empty_when_missing("EU VAT registration number"),
                    "mvaRegistration": empty_when_missing("VAT registration number"),
                    "postalCode": empty_when_missing("Postal code of the sender"),
                    "city": empty_when_missing("City of the sender"),
                    "phoneNumber": empty_when_missing("Phone number of the sender"),
                    "email": empty_when_missing("Email address of the sender"),
                    "website": empty_when_missing("Website URL of the sender"),
                },
                "required": [
                    "name", "streetAddress", "orgNumber", "businessRegistration",
                    "euRegistration", "mvaRegistration", "postalCode", "city",
                    "phoneNumber", "email", "website",
                ],
                "additionalProperties": false,
            },
        },
        "required": ["workLists", "lineItems", "invoice", "recipient", "reference", "totals", "sender"],
        "additionalProperties": false,
    })
}

/// The bbox/image annotation schema.
fn image_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "index": { "type": "number", "description": "Index of the image" },
            "base64": { "type": "string", "description": "Base64 encoded image data" },
            "shortDescription": { "type": "string", "description": "A short description of the image" },
            "summary": { "type": "string", "description": "Summary of the image" },
        },
        "required": ["index", "base64", "shortDescription", "summary"],
        "additionalProperties": false,
    })
}
