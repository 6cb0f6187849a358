//! Capability contracts.
//!
//! # Data Flow
//! ```text
//! http_api! { .. } or a hand-written ApiContract impl
//!     → C::methods() (contract as data)
//!     → validation.rs (InvalidContract / UnsupportedType)
//!     → registry.rs (one InterfaceDescriptor per type, cached)
//!     → C::bind(Proxy) (typed façade over the dispatcher)
//! ```
//!
//! # Design Decisions
//! - A contract is a method table, not generated per-interface glue:
//!   every façade method forwards to one generic dispatcher keyed by name
//! - The façade only reaches the methods it declares
//! - Descriptors are derived once per type and never mutated

pub mod descriptor;
pub mod registry;
pub mod validation;

pub use descriptor::{InterfaceDescriptor, MethodDescriptor, ParamDescriptor, ParamRole, ReturnShape};

use crate::proxy::Proxy;

/// A declared HTTP API.
///
/// Usually generated by [`http_api!`](crate::http_api); implement it by
/// hand when the macro's grammar is too narrow.
pub trait ApiContract: Sized + Send + Sync + 'static {
    /// Contract name used in errors and logs.
    fn name() -> &'static str;

    /// The declared methods.
    fn methods() -> Vec<MethodDescriptor>;

    /// Contract-level default destination.
    fn base_address() -> Option<&'static str> {
        None
    }

    /// Wrap a dispatcher bound to this contract.
    fn bind(proxy: Proxy) -> Self;

    /// The dispatcher backing this client.
    fn proxy(&self) -> &Proxy;

    /// Release the client's chain resources. Idempotent.
    fn dispose(&self) {
        self.proxy().dispose();
    }
}

/// Declare a contract and generate its typed client.
///
/// ```ignore
/// http_api! {
///     /// Baidu front page.
///     pub struct BaiduApi {
///         fn fetch_home() -> pending String = GET "/";
///         fn search(query wd: &str) -> blocking String = GET "/s";
///         fn item(path id: u64, header authorization: &str) -> pending Json<Item> = GET "/items/{id}";
///         fn upload(body item: &Item) -> detached = POST "/items";
///     }
/// }
/// ```
///
/// Parameter roles are `path`, `query`, `header` and `body`. Shapes are
/// `blocking` (returns `Result<T, ApiError>`), `pending` (returns
/// `PendingCall<T>`) and `detached` (returns nothing).
#[macro_export]
macro_rules! http_api {
    (@fn [$(#[$attr:meta])*] $vis:vis $method:ident ( $( $arg:ident : $ty:ty ),* ) blocking $ret:ty) => {
        $(#[$attr])*
        $vis fn $method(&self $(, $arg: $ty)*) -> ::std::result::Result<$ret, $crate::ApiError> {
            let args = $crate::http::Arguments::new() $( .with(stringify!($arg), &$arg) )*;
            self.proxy.invoke_blocking(stringify!($method), args)
        }
    };
    (@fn [$(#[$attr:meta])*] $vis:vis $method:ident ( $( $arg:ident : $ty:ty ),* ) pending $ret:ty) => {
        $(#[$attr])*
        $vis fn $method(&self $(, $arg: $ty)*) -> $crate::proxy::PendingCall<$ret> {
            let args = $crate::http::Arguments::new() $( .with(stringify!($arg), &$arg) )*;
            self.proxy.invoke_async(stringify!($method), args)
        }
    };
    (@fn [$(#[$attr:meta])*] $vis:vis $method:ident ( $( $arg:ident : $ty:ty ),* ) detached) => {
        $(#[$attr])*
        $vis fn $method(&self $(, $arg: $ty)*) {
            let args = $crate::http::Arguments::new() $( .with(stringify!($arg), &$arg) )*;
            self.proxy.invoke_detached(stringify!($method), args)
        }
    };

    (@shape blocking) => { $crate::contract::ReturnShape::Blocking };
    (@shape pending) => { $crate::contract::ReturnShape::Pending };
    (@shape detached) => { $crate::contract::ReturnShape::Detached };

    (@role path) => { $crate::contract::ParamRole::Path };
    (@role query) => { $crate::contract::ParamRole::Query };
    (@role header) => { $crate::contract::ParamRole::Header };
    (@role body) => { $crate::contract::ParamRole::Body };

    (@base $base:literal) => { ::std::option::Option::Some($base) };
    (@base) => { ::std::option::Option::None };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(at $base:literal)? {
            $(
                $(#[$mmeta:meta])*
                fn $method:ident ( $( $role:ident $arg:ident : $ty:ty ),* $(,)? )
                    -> $shape:ident $( $ret:ty )? = $verb:ident $path:literal ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            proxy: $crate::proxy::Proxy,
        }

        impl $crate::contract::ApiContract for $name {
            fn name() -> &'static str {
                stringify!($name)
            }

            fn methods() -> ::std::vec::Vec<$crate::contract::MethodDescriptor> {
                ::std::vec![
                    $(
                        $crate::contract::MethodDescriptor::new(
                            stringify!($method),
                            $crate::__private::Method::$verb,
                            $path,
                            $crate::http_api!(@shape $shape),
                        )
                        $( .param(stringify!($arg), $crate::http_api!(@role $role)) )*
                    ),*
                ]
            }

            fn base_address() -> ::std::option::Option<&'static str> {
                $crate::http_api!(@base $($base)?)
            }

            fn bind(proxy: $crate::proxy::Proxy) -> Self {
                Self { proxy }
            }

            fn proxy(&self) -> &$crate::proxy::Proxy {
                &self.proxy
            }
        }

        impl $name {
            $(
                $crate::http_api!(
                    @fn [$(#[$mmeta])*] $vis $method ( $( $arg : $ty ),* ) $shape $( $ret )?
                );
            )*
        }
    }
}
