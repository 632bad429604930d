/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - auth::access::apply(...) (認証ゲート), scoped::ScopedFilterLayer (controller 限定フィルタ), http::apply(...)
 */
pub mod auth;
pub mod http;
pub mod scoped;
