/// Opaque sample identifier shared by every input archive.
/// Conventionally a fixed-width decimal string.
/// Example: `0001234`
pub type SampleKey = String;
/// Field name within a record's payload map, derived from the entry-name
/// suffix after the key stem.
/// Examples: `image.png`, `embedding.pyd`, `json`
pub type FieldName = String;
/// Identifier naming one input archive in diagnostics and errors.
/// Examples: `features`, `cc-by-2`, `cc-by-nc-sa-2`
pub type ArchiveId = String;
