/*!

The format specifications for field-pack.

field-pack stores a record as a standard MessagePack array and replaces individual fields with
extension blocks carrying their compressed bytes. Everything a reader needs to undo this is in the
bytes themselves.

- [Wire Format](./wire_format/index.html)
- [Field Walking](./fields/index.html)

*/

pub mod fields;
pub mod wire_format;
