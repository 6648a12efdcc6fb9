//! Built-in environment service types: `s3`, `dynamodb` and `apiaccess`.

mod apiaccess;
mod dynamodb;
mod s3;

pub use apiaccess::ApiAccessService;
pub use dynamodb::DynamoDbService;
pub use s3::S3Service;
