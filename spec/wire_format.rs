/*!

The wire format of a compressed field.

A compressed field is a MessagePack extension value with the extension type `MP_COMPRESSION`,
which is 5. The extension payload starts with a single byte naming the compression algorithm, and
the rest of it is the algorithm's own output.

```text
+--------------------+------+---------+-------------------+
| ext marker, length | 0x05 | alg tag | payload (len - 1) |
+--------------------+------+---------+-------------------+
```

The extension header is always written in its shortest form: `fixext1/2/4/8/16` when the payload
length (tag byte included) is exactly 1, 2, 4, 8, or 16 bytes, then `ext8`, `ext16`, and `ext32`
as the length grows. Lengths are big-endian, as everywhere in MessagePack.

# Algorithm Tags

| Tag | Name | Payload                                                                          |
| --  | --   | --                                                                               |
| 0   | none | The raw field, unchanged                                                         |
| 1   | zstd | One zstd frame, recording its content size and a content checksum                |
| 2   | lz4  | Raw field length as a little-endian u32, one lz4 block, then a little-endian CRC32 |

Any other tag is an error. The set is closed: a reader never guesses at an algorithm it doesn't
know.

The zstd frame uses the standard frame format (with the magic number) and no dictionary. Because
the frame records its content size, a reader can learn the decompressed size of a field from the
frame header alone.

The lz4 checksum is the CRC32 (IEEE) of the length prefix and the block together. A reader checks
it before trusting the length, so neither algorithm decodes a damaged payload into a different
value.

# When a Field is Wrapped

A field is only wrapped when the wrapped form is strictly smaller than the raw field:

```text
sizeof_ext(1 + compressed_len) < raw_len
```

Otherwise the field is written exactly as it was, with no extension at all. Writers may instead be
configured to keep the wrapper and store the raw field under the `none` tag, which costs the size
of the extension header plus one byte. Readers must accept both.

# Reading

A reader looks at the extension type and nothing else to decide whether a value is compressed. A
value that isn't an `MP_COMPRESSION` extension is a plain value, even if it is some other
extension.

A compression block is malformed if:

- its extension length is 0 (there is no tag byte),
- its extension length runs past the end of the data,
- its tag isn't one of the tags above,
- its payload fails its checksum,
- its payload doesn't decompress to exactly the size it declares, or
- the decompressed bytes aren't exactly one complete MessagePack value.

*/
