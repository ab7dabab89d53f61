//! 通用工具函数

use rand::RngCore;
use rand::rngs::OsRng;

/// 不透明令牌的随机字节数（256 bit）
pub const OPAQUE_TOKEN_BYTES: usize = 32;

/// 生成不可猜测的不透明令牌
///
/// 从操作系统 CSPRNG 读取 [`OPAQUE_TOKEN_BYTES`] 字节并以小写十六进制编码。
pub fn random_token() -> String {
    let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_token_length_and_alphabet() {
        let token = random_token();
        assert_eq!(token.len(), OPAQUE_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_random_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| random_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
