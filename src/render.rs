//! Bounded printf-style rendering into a caller buffer.
//!
//! Supported directives, in the order their parts must appear:
//!
//! ```text
//! %%                 literal '%'
//! %[0][width][l|ll]d signed decimal
//! %[0][width][l|ll]u unsigned decimal
//! %[0][width][l|ll]x hex, lower case digits
//! %[0][width][l|ll]X hex, upper case digits
//! %[0][width]s       string, None renders as "(null)"
//! %[0][width]c       single byte from an integer argument, or the first
//!                    byte of a string argument, None renders as "(null)"
//! ```
//!
//! Without `l` an integer is 16 bits wide, `l` is 32 bits and `ll` is 64 bits.
//! Padding always goes in front of the value: spaces by default, `'0'` with the
//! zero flag. Width is capped at 255. A directive with an unknown conversion
//! character renders nothing but still consumes one argument, so the
//! directives after it keep their positions.

/// Widest rendering of a 64-bit value plus sign.
const DIGITS_CAPACITY: usize = 22;
const MAX_WIDTH: usize = 255;
const NULL_STR: &str = "(null)";

/// One argument consumed by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Int(i64),
    Uint(u64),
    Str(Option<&'a str>),
}

impl Arg<'_> {
    fn as_i64(self) -> i64 {
        match self {
            Arg::Int(v) => v,
            Arg::Uint(v) => v as i64,
            Arg::Str(_) => 0,
        }
    }

    fn as_u64(self) -> u64 {
        match self {
            Arg::Int(v) => v as u64,
            Arg::Uint(v) => v,
            Arg::Str(_) => 0,
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Arg::Str(Some(s)) => s,
            _ => NULL_STR,
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Arg<'_> {
                fn from(v: $t) -> Self {
                    Arg::$variant(v as $wide)
                }
            }
        )*
    };
}

impl_from_int!(Int as i64: i8, i16, i32, i64, isize);
impl_from_int!(Uint as u64: u8, u16, u32, u64, usize);

impl From<char> for Arg<'_> {
    fn from(c: char) -> Self {
        Arg::Uint(c as u64)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(s: &'a str) -> Self {
        Arg::Str(Some(s))
    }
}

impl<'a> From<Option<&'a str>> for Arg<'a> {
    fn from(s: Option<&'a str>) -> Self {
        Arg::Str(s)
    }
}

/// Renders `template` into `out` and returns the number of bytes written.
///
/// Variadic entry point over [`render`]:
///
/// ```
/// let mut buf = [0u8; 16];
/// let n = pico_bus_console::render!(&mut buf, "%05d", -42);
/// assert_eq!(&buf[..n], b"-0042");
/// ```
#[macro_export]
macro_rules! render {
    ($out:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $crate::render::render($out, $template, &[$($crate::render::Arg::from($arg)),*])
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Length {
    Short,
    Long,
    LongLong,
}

#[derive(Debug, Clone, Copy)]
struct Spec {
    zero: bool,
    width: usize,
    length: Length,
}

impl Spec {
    fn pad(&self) -> u8 {
        if self.zero { b'0' } else { b' ' }
    }
}

/// Writer over the caller buffer that keeps the last byte for the terminator.
struct Cursor<'a> {
    buffer: &'a mut [u8],
    position: usize,
    limit: usize,
}

impl Cursor<'_> {
    fn is_full(&self) -> bool {
        self.position >= self.limit
    }

    fn put(&mut self, byte: u8) {
        if !self.is_full() {
            self.buffer[self.position] = byte;
            self.position += 1;
        }
    }

    fn put_padded(&mut self, text: &[u8], width: usize, pad: u8) {
        for _ in text.len()..width {
            self.put(pad);
        }
        for &byte in text {
            self.put(byte);
        }
    }

    fn finish(self) -> usize {
        self.buffer[self.position] = 0;
        self.position
    }
}

/// Renders `template` with a pre-collected argument list.
///
/// Never writes past `out.len()`, always null-terminates a non-empty buffer and
/// returns the number of bytes written before the terminator.
pub fn render(out: &mut [u8], template: &str, args: &[Arg<'_>]) -> usize {
    let Some(limit) = out.len().checked_sub(1) else {
        return 0;
    };
    let mut cursor = Cursor {
        buffer: out,
        position: 0,
        limit,
    };
    let mut args = args.iter().copied();
    let mut next_arg = move || args.next().unwrap_or(Arg::Str(None));

    let fmt = template.as_bytes();
    let mut i = 0;

    while i < fmt.len() && !cursor.is_full() {
        if fmt[i] != b'%' {
            cursor.put(fmt[i]);
            i += 1;
            continue;
        }
        i += 1;

        if fmt.get(i) == Some(&b'%') {
            cursor.put(b'%');
            i += 1;
            continue;
        }

        let mut spec = Spec {
            zero: false,
            width: 0,
            length: Length::Short,
        };
        while fmt.get(i) == Some(&b'0') {
            spec.zero = true;
            i += 1;
        }
        while let Some(d) = fmt.get(i).filter(|d| d.is_ascii_digit()) {
            spec.width = (spec.width * 10 + usize::from(d - b'0')).min(MAX_WIDTH);
            i += 1;
        }
        if fmt.get(i) == Some(&b'l') {
            spec.length = Length::Long;
            i += 1;
            if fmt.get(i) == Some(&b'l') {
                spec.length = Length::LongLong;
                i += 1;
            }
        }

        let Some(&conversion) = fmt.get(i) else {
            break;
        };
        i += 1;

        match conversion {
            b's' => {
                let arg = next_arg();
                cursor.put_padded(arg.as_str().as_bytes(), spec.width, spec.pad());
            }
            b'c' => {
                let arg = next_arg();
                let byte = [arg.as_u64() as u8];
                let text = match arg {
                    Arg::Str(Some(s)) => &s.as_bytes()[..s.len().min(1)],
                    Arg::Str(None) => NULL_STR.as_bytes(),
                    _ => &byte,
                };
                cursor.put_padded(text, spec.width, spec.pad());
            }
            b'd' => {
                let value = match spec.length {
                    Length::Short => next_arg().as_i64() as i16 as i64,
                    Length::Long => next_arg().as_i64() as i32 as i64,
                    Length::LongLong => next_arg().as_i64(),
                };
                put_integer(&mut cursor, value.unsigned_abs(), value < 0, Radix::Decimal, spec);
            }
            b'u' | b'x' | b'X' => {
                let value = match spec.length {
                    Length::Short => next_arg().as_u64() as u16 as u64,
                    Length::Long => next_arg().as_u64() as u32 as u64,
                    Length::LongLong => next_arg().as_u64(),
                };
                let radix = match conversion {
                    b'x' => Radix::Lower,
                    b'X' => Radix::Upper,
                    _ => Radix::Decimal,
                };
                put_integer(&mut cursor, value, false, radix, spec);
            }
            // Unknown conversions still take their argument slot.
            _ => {
                next_arg();
            }
        }
    }

    cursor.finish()
}

#[derive(Clone, Copy)]
enum Radix {
    Decimal,
    Lower,
    Upper,
}

fn put_integer(cursor: &mut Cursor<'_>, mut magnitude: u64, negative: bool, radix: Radix, spec: Spec) {
    let (base, letters) = match radix {
        Radix::Decimal => (10, b'a'),
        Radix::Lower => (16, b'a'),
        Radix::Upper => (16, b'A'),
    };

    let mut digits = [0u8; DIGITS_CAPACITY];
    let mut start = DIGITS_CAPACITY;
    loop {
        let digit = (magnitude % base) as u8;
        start -= 1;
        digits[start] = if digit < 10 { b'0' + digit } else { letters + digit - 10 };
        magnitude /= base;
        if magnitude == 0 {
            break;
        }
    }

    let mut width = spec.width;
    if negative {
        if spec.zero && width != 0 {
            cursor.put(b'-');
            width -= 1;
        } else {
            start -= 1;
            digits[start] = b'-';
        }
    }

    cursor.put_padded(&digits[start..], width, spec.pad());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(template: &str, args: &[Arg<'_>]) -> std::string::String {
        let mut buf = [0xaau8; 64];
        let n = render(&mut buf, template, args);
        assert_eq!(buf[n], 0, "missing terminator");
        std::string::String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn test_zero_padded_negative() {
        assert_eq!(rendered("%05d", &[Arg::from(-42)]), "-0042");
    }

    #[test]
    fn test_space_padded_negative() {
        assert_eq!(rendered("%5d", &[Arg::from(-42)]), "  -42");
    }

    #[test]
    fn test_hex_lower_and_upper() {
        assert_eq!(rendered("%x", &[Arg::from(255)]), "ff");
        assert_eq!(rendered("%X", &[Arg::from(0xbeefu16)]), "BEEF");
        assert_eq!(rendered("0x%02X", &[Arg::from(7u8)]), "0x07");
    }

    #[test]
    fn test_string_width() {
        assert_eq!(rendered("%5s", &[Arg::from("ab")]), "   ab");
        assert_eq!(rendered("%1s", &[Arg::from("abc")]), "abc");
    }

    #[test]
    fn test_null_string() {
        assert_eq!(rendered("[%s]", &[Arg::Str(None)]), "[(null)]");
    }

    #[test]
    fn test_percent_literal() {
        assert_eq!(rendered("%%", &[]), "%");
        assert_eq!(rendered("100%%", &[]), "100%");
    }

    #[test]
    fn test_zero_value() {
        assert_eq!(rendered("%d", &[Arg::from(0)]), "0");
        assert_eq!(rendered("%3u", &[Arg::from(0)]), "  0");
        assert_eq!(rendered("%03x", &[Arg::from(0)]), "000");
    }

    #[test]
    fn test_char() {
        assert_eq!(rendered("%c%c", &[Arg::from('o'), Arg::from(107)]), "ok");
    }

    #[test]
    fn test_char_from_string_or_missing() {
        let mut buf = [0xaau8; 16];
        let n = render(&mut buf, "[%c]", &[Arg::from("xyz")]);
        assert_eq!(&buf[..n], b"[x]");

        assert_eq!(rendered("[%c]", &[Arg::from("")]), "[]");
        assert_eq!(rendered("[%c]", &[]), "[(null)]");
        assert_eq!(rendered("[%3c]", &[Arg::from("q")]), "[  q]");
    }

    #[test]
    fn test_length_modifiers() {
        // Without a modifier the value is 16 bits wide.
        assert_eq!(rendered("%d", &[Arg::from(70000)]), "4464");
        assert_eq!(rendered("%u", &[Arg::from(-1)]), "65535");
        assert_eq!(rendered("%lu", &[Arg::from(-1)]), "4294967295");
        assert_eq!(rendered("%ld", &[Arg::from(70000)]), "70000");
        assert_eq!(rendered("%lld", &[Arg::from(i64::MIN)]), "-9223372036854775808");
        assert_eq!(rendered("%llx", &[Arg::from(u64::MAX)]), "ffffffffffffffff");
        assert_eq!(rendered("%05lX", &[Arg::from(0xabcu32)]), "00ABC");
    }

    #[test]
    fn test_unknown_directive_consumes_argument() {
        assert_eq!(rendered("a%qb", &[]), "ab");
        assert_eq!(rendered("a%qb%d", &[Arg::from(7), Arg::from(9)]), "ab9");
        assert_eq!(rendered("a%5qb%d", &[Arg::from(3)]), "ab0");
    }

    #[test]
    fn test_trailing_percent() {
        assert_eq!(rendered("abc%", &[]), "abc");
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(rendered("%d %s", &[]), "0 (null)");
    }

    #[test]
    fn test_width_is_capped() {
        let mut buf = [0u8; 300];
        let n = render(&mut buf, "%999d", &[Arg::from(1)]);
        assert_eq!(n, 255);
    }

    #[test]
    fn test_truncates_to_capacity() {
        let mut buf = [0xaau8; 6];
        let n = render(&mut buf, "hello world", &[]);
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello\0");

        let n = render(&mut buf, "%8d", &[Arg::from(12)]);
        assert_eq!(n, 5);
        assert_eq!(&buf, b"     \0");
    }

    #[test]
    fn test_empty_buffer() {
        let mut buf = [0u8; 0];
        assert_eq!(render(&mut buf, "abc", &[]), 0);

        let mut one = [0xaau8; 1];
        assert_eq!(render(&mut one, "abc", &[]), 0);
        assert_eq!(one[0], 0);
    }

    #[test]
    fn test_variadic_entry_point() {
        let mut buf = [0u8; 32];
        let n = crate::render!(&mut buf, "%s=%04x", "reg", 0x1fu8);
        assert_eq!(&buf[..n], b"reg=001f");
    }

    #[test]
    fn test_forwarded_argument_list() {
        fn wrapper(out: &mut [u8], template: &str, args: &[Arg<'_>]) -> usize {
            let n = render(out, "> ", &[]);
            n + render(&mut out[n..], template, args)
        }

        let mut buf = [0u8; 32];
        let n = wrapper(&mut buf, "%u/%u", &[Arg::from(3), Arg::from(4)]);
        assert_eq!(&buf[..n], b"> 3/4");
    }
}
