/*!
 * Principal accessor
 *
 * Responsibility:
 * - 認証ゲートが request extensions に入れた Principal を読み出す
 * - 関数 (current_user) / 拡張メソッド (RequestPrincipalExt) / extractor (CurrentUser) の 3 通りで提供
 *
 * Public API:
 * - current_user
 * - RequestPrincipalExt
 * - CurrentUser
 */

mod core;

pub use self::core::{CurrentUser, RequestPrincipalExt, current_user};
