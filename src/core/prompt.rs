//! Fixed instruction sent with every diagram

/// Prompt asking the model for a raw JSON array of parts
pub const BOM_PROMPT: &str = r#"Analyze the provided product diagram/image.
Identify all parts, callout numbers, and quantities visible or implied.
Return ONLY a raw JSON array of objects.
Each object must have the following fields:
- "id": The callout number or identifier from the diagram (string).
- "part_name": The name of the part (string).
- "quantity": The count of this part (integer).
- "description": A brief description of the part or its function if evident (string).

Do not include any markdown formatting (like ```json ... ```). Just the raw JSON array.
If no parts are found, return an empty array [].
"#;
