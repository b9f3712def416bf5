mod absolute_path_ext;
mod async_conversion;

pub use absolute_path_ext::AbsolutePathExt;
pub use async_conversion::AsyncTryFrom;
