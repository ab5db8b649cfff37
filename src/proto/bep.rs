// Generated from src/proto/bep.proto. Do not hand-edit the message
// definitions below this header; the surrounding impls are hand-written.

#![allow(missing_docs)]
#![allow(clippy::derive_partial_eq_without_eq)]

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Hello {
    #[prost(string, tag = "1")]
    pub device_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub client_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub client_version: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    ClusterConfig = 0,
    Index = 1,
    IndexUpdate = 2,
    Request = 3,
    Response = 4,
    DownloadProgress = 5,
    Ping = 6,
    Close = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageCompression {
    None = 0,
    Lz4 = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(enumeration = "MessageCompression", tag = "2")]
    pub compression: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FileInfoType {
    File = 0,
    Directory = 1,
    Symlink = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockInfo {
    #[prost(int64, tag = "1")]
    pub offset: i64,
    #[prost(int32, tag = "2")]
    pub size: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub weak_hash: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileInfo {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "FileInfoType", tag = "2")]
    pub r#type: i32,
    #[prost(int64, tag = "3")]
    pub size: i64,
    #[prost(uint32, tag = "4")]
    pub permissions: u32,
    #[prost(int64, tag = "5")]
    pub modified_s: i64,
    #[prost(int32, tag = "11")]
    pub modified_ns: i32,
    #[prost(int64, tag = "6")]
    pub sequence: i64,
    #[prost(bool, tag = "10")]
    pub deleted: bool,
    #[prost(bool, tag = "12")]
    pub invalid: bool,
    #[prost(bool, tag = "13")]
    pub no_permissions: bool,
    #[prost(int32, tag = "15")]
    pub block_size: i32,
    #[prost(message, repeated, tag = "16")]
    pub blocks: ::prost::alloc::vec::Vec<BlockInfo>,
    #[prost(string, tag = "17")]
    pub symlink_target: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Device {
    #[prost(bytes = "vec", tag = "1")]
    pub id: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub addresses: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(enumeration = "MessageCompression", tag = "4")]
    pub compression: i32,
    #[prost(string, tag = "5")]
    pub cert_name: ::prost::alloc::string::String,
    #[prost(int64, tag = "6")]
    pub max_sequence: i64,
    #[prost(bool, tag = "7")]
    pub introducer: bool,
    #[prost(uint64, tag = "8")]
    pub index_id: u64,
    #[prost(bool, tag = "9")]
    pub skip_introduction_removals: bool,
    #[prost(bytes = "vec", tag = "10")]
    pub encryption_password_token: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Folder {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub label: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub read_only: bool,
    #[prost(bool, tag = "4")]
    pub ignore_permissions: bool,
    #[prost(bool, tag = "5")]
    pub ignore_delete: bool,
    #[prost(bool, tag = "6")]
    pub disabled: bool,
    #[prost(bool, tag = "7")]
    pub paused: bool,
    #[prost(message, repeated, tag = "16")]
    pub devices: ::prost::alloc::vec::Vec<Device>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterConfig {
    #[prost(message, repeated, tag = "1")]
    pub folders: ::prost::alloc::vec::Vec<Folder>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Index {
    #[prost(string, tag = "1")]
    pub folder: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub files: ::prost::alloc::vec::Vec<FileInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IndexUpdate {
    #[prost(string, tag = "1")]
    pub folder: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub files: ::prost::alloc::vec::Vec<FileInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub folder: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(int64, tag = "4")]
    pub offset: i64,
    #[prost(int32, tag = "5")]
    pub size: i32,
    #[prost(bytes = "vec", tag = "6")]
    pub hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "7")]
    pub from_temporary: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    Generic = 1,
    NoSuchFile = 2,
    InvalidFile = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "ErrorCode", tag = "3")]
    pub code: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileDownloadProgressUpdate {
    #[prost(enumeration = "file_download_progress_update::Type", tag = "1")]
    pub update_type: i32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, tag = "3")]
    pub version: i32,
    #[prost(int32, repeated, tag = "4")]
    pub block_indexes: ::prost::alloc::vec::Vec<i32>,
}

pub mod file_download_progress_update {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Append = 0,
        Forget = 1,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownloadProgress {
    #[prost(string, tag = "1")]
    pub folder: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub updates: ::prost::alloc::vec::Vec<FileDownloadProgressUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Close {
    #[prost(string, tag = "1")]
    pub reason: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Announce {
    #[prost(bytes = "vec", tag = "1")]
    pub id: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, repeated, tag = "2")]
    pub addresses: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(int64, tag = "3")]
    pub instance_id: i64,
}
