/*!

How records are walked.

A record is exactly one MessagePack array. Each element of the array is a field. Nothing may
follow the array.

# Compressing

Fields are addressed by position. A field policy names an algorithm for each of the first N
fields; fields past N, and fields whose algorithm is `none`, are copied unchanged. Every other
field is compressed and then wrapped or left alone according to the
[wrapping rule](../wire_format/index.html#when-a-field-is-wrapped).

The output array has the same length as the input array, and the fields stay in order. Since no
field grows under the default fallback, the output is never larger than the input.

A policy naming no fields at all leaves the record untouched, without even looking at it.

# Decompressing

Decompression needs no policy. Every field is read on its own: compression blocks are expanded and
everything else is copied. The result is byte-for-byte identical to the record that was compressed.

# Sizing

Both directions size their output before writing it. When compressing, each field is compressed
once and the result is held in scratch memory until the output is written. When decompressing,
the decompressed size of every block is read from its header, so the output is allocated once.

*/
