//! Prompt construction for receipt field extraction.
//!
//! Both backends receive the identical system instruction and user prompt,
//! so they are interchangeable from the job processor's point of view.

/// System instruction sent with every extraction request.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant for extracting structured data from receipts.";

/// Builds the fixed instruction prompt, embedding the OCR text verbatim.
pub fn build_prompt(ocr_text: &str) -> String {
    format!(
        "Extract the following fields from this receipt OCR text:\n\
         - merchant (store name)\n\
         - date (in YYYY-MM-DD or DD.MM.YYYY format)\n\
         - total (final amount, with currency if possible)\n\
         Return a JSON object with keys: merchant, date, total.\n\
         OCR text:\n\
         {}\n\
         JSON:",
        ocr_text
    )
}
