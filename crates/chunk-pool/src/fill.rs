use std::io::{self, ErrorKind, Read};

/// 从字节源读取数据，直到写满 `dst` 或字节源报告数据结束。
///
/// # 契约说明（What）
/// - 返回真实读取的字节数；字节源在写满之前结束（`read` 返回 0）视为成功的部分填充；
/// - `ErrorKind::Interrupted` 按 `std::io` 惯例重新发起读取，与 `Read::read_exact` 一致；
/// - 其它错误原样返回，重试策略由调用方决定；
/// - 错误发生在部分读取之后时，已写入 `dst` 的字节保留在原处，但返回值不携带这一数量，
///   调用方无法得知有多少字节落地，只能把整块 `dst` 视为内容未定。
pub fn fill_from<R>(dst: &mut [u8], source: &mut R) -> io::Result<usize>
where
    R: Read + ?Sized,
{
    let mut filled = 0;
    while filled < dst.len() {
        match source.read(&mut dst[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 每次只吐出一个字节的字节源，用于覆盖多次 `read` 拼接的路径。
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn trickling_source_is_assembled_until_full() {
        let mut dst = [0u8; 4];
        let mut source = Trickle(b"abcdef");
        assert_eq!(fill_from(&mut dst, &mut source).expect("填充不应失败"), 4);
        assert_eq!(&dst, b"abcd");
        assert_eq!(source.0, b"ef");
    }

    #[test]
    fn empty_destination_reads_nothing() {
        let mut source: &[u8] = b"xyz";
        assert_eq!(fill_from(&mut [], &mut source).expect("空目标不应失败"), 0);
        assert_eq!(source, b"xyz");
    }

    #[test]
    fn interrupted_reads_are_reissued() {
        struct InterruptOnce {
            interrupted: bool,
        }

        impl Read for InterruptOnce {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::from(ErrorKind::Interrupted));
                }
                buf[..2].copy_from_slice(b"ok");
                Ok(2)
            }
        }

        let mut dst = [0u8; 2];
        let mut source = InterruptOnce { interrupted: false };
        assert_eq!(fill_from(&mut dst, &mut source).expect("中断后应重读"), 2);
        assert_eq!(&dst, b"ok");
    }
}
