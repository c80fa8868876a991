//! The shared forensic-audit instruction sent to every provider.

/// Build the audit prompt for one document. The JSON skeleton below is the
/// contract the reconciliation engine reads (`pages[].line_items[]`,
/// `financials`, `fraud_analysis`); all three providers receive the same
/// text.
pub fn audit_prompt(document_name: &str, page_count: usize) -> String {
    format!(
        r#"You are an expert Forensic Auditor. Analyze this document (Filename: {document_name}, Pages: {page_count}).

INSTRUCTIONS:
1. **EXTRACTION**: Extract all visible data. If a Total is clearly the final amount to be paid, extract it.
2. **PAGE MAPPING**: Assign items to their correct pages based on visual markers.
3. **ANALYSIS**: Flag visual anomalies (edits, fonts) and duplicate items.

TASK:
1. Extract Header Info.
2. Extract Line Items (Description, Qty, Unit Price, Amount).
3. Extract Financial Totals (Subtotal, Tax, Total).

OUTPUT JSON STRUCTURE:
{{
    "file_info": {{
        "file_name": "{document_name}",
        "page_count": {page_count},
        "document_type": "Invoice/Receipt/Bill/Statement",
        "document_title": "string",
        "printed_on": "string or null"
    }},
    "header": {{
        "id": "string",
        "date": "YYYY-MM-DD",
        "vendor_name": "string",
        "recipient_name": "string"
    }},
    "pages": [
        {{
            "page_number": 1,
            "line_items": [
                {{"description": "string", "quantity": number, "unit_price": number, "amount": number}}
            ],
            "page_anomalies": ["list", "of", "visual", "issues"]
        }}
    ],
    "financials": {{
        "subtotal": number,
        "tax": number,
        "extracted_total": number
    }},
    "fraud_analysis": {{
        "risk_level": "LOW/MEDIUM/HIGH",
        "pixel_anomalies_detected": boolean,
        "duplicates_detected": boolean,
        "flags": ["list", "of", "issues"],
        "reasoning": "detailed explanation"
    }}
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_document_context() {
        let prompt = audit_prompt("scan_042.png", 3);
        assert!(prompt.contains("Filename: scan_042.png"));
        assert!(prompt.contains("Pages: 3"));
        assert!(prompt.contains("\"extracted_total\""));
        assert!(prompt.contains("\"risk_level\""));
    }
}
