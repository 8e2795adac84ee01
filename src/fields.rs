/// Ordered column values of one logical line.
pub type FieldList = Vec<String>;

/// Splits one logical line into comma-separated fields.
///
/// Quotes toggle quoted mode and are not part of the value; inside a quoted
/// field `""` is a literal quote. Never fails: unbalanced quotes simply leave
/// the rest of the line in the last field. The trailing field is always
/// emitted, so an empty line yields one empty field.
pub fn parse_fields(line: &str) -> FieldList {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    fields.push(current);
    fields
}
