//! OpenFGA client and authorization store for Weld

pub mod client;
pub mod model;
pub mod service;

#[cfg(test)]
mod tests;

pub use client::{FgaClient, FgaConfig};
pub use model::{authorization_model, SCHEMA_VERSION};
pub use service::FgaAuthorizationStore;

/// Generated protobuf types from the OpenFGA v1 API
#[allow(clippy::all)]
pub mod proto {
    // Stores
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateStoreRequest {
        #[prost(string, tag = "1")]
        pub name: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateStoreResponse {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(message, optional, tag = "3")]
        pub created_at: Option<::prost_types::Timestamp>,
        #[prost(message, optional, tag = "4")]
        pub updated_at: Option<::prost_types::Timestamp>,
    }

    // Authorization models
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteAuthorizationModelRequest {
        #[prost(string, tag = "1")]
        pub store_id: String,
        #[prost(message, repeated, tag = "2")]
        pub type_definitions: Vec<TypeDefinition>,
        #[prost(string, tag = "3")]
        pub schema_version: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteAuthorizationModelResponse {
        #[prost(string, tag = "1")]
        pub authorization_model_id: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ReadAuthorizationModelsRequest {
        #[prost(string, tag = "1")]
        pub store_id: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ReadAuthorizationModelsResponse {
        #[prost(message, repeated, tag = "1")]
        pub authorization_models: Vec<AuthorizationModel>,
        #[prost(string, tag = "2")]
        pub continuation_token: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AuthorizationModel {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub schema_version: String,
        #[prost(message, repeated, tag = "3")]
        pub type_definitions: Vec<TypeDefinition>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TypeDefinition {
        #[prost(string, tag = "1")]
        pub r#type: String,
        #[prost(map = "string, message", tag = "2")]
        pub relations: ::std::collections::HashMap<String, Userset>,
        #[prost(message, optional, tag = "3")]
        pub metadata: Option<Metadata>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Userset {
        #[prost(oneof = "userset::Userset", tags = "1, 2, 3, 4")]
        pub userset: Option<userset::Userset>,
    }

    pub mod userset {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Userset {
            #[prost(message, tag = "1")]
            This(super::DirectUserset),
            #[prost(message, tag = "2")]
            ComputedUserset(super::ObjectRelation),
            #[prost(message, tag = "3")]
            TupleToUserset(super::TupleToUserset),
            #[prost(message, tag = "4")]
            Union(super::Usersets),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DirectUserset {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ObjectRelation {
        #[prost(string, tag = "1")]
        pub object: String,
        #[prost(string, tag = "2")]
        pub relation: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TupleToUserset {
        #[prost(message, optional, tag = "1")]
        pub tupleset: Option<ObjectRelation>,
        #[prost(message, optional, tag = "2")]
        pub computed_userset: Option<ObjectRelation>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Usersets {
        #[prost(message, repeated, tag = "1")]
        pub child: Vec<Userset>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Metadata {
        #[prost(map = "string, message", tag = "1")]
        pub relations: ::std::collections::HashMap<String, RelationMetadata>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RelationMetadata {
        #[prost(message, repeated, tag = "1")]
        pub directly_related_user_types: Vec<RelationReference>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RelationReference {
        #[prost(string, tag = "1")]
        pub r#type: String,
        #[prost(oneof = "relation_reference::RelationOrWildcard", tags = "2")]
        pub relation_or_wildcard: Option<relation_reference::RelationOrWildcard>,
    }

    pub mod relation_reference {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum RelationOrWildcard {
            #[prost(string, tag = "2")]
            Relation(String),
        }
    }

    // Relationship tuples
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TupleKey {
        #[prost(string, tag = "1")]
        pub user: String,
        #[prost(string, tag = "2")]
        pub relation: String,
        #[prost(string, tag = "3")]
        pub object: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TupleKeyWithoutCondition {
        #[prost(string, tag = "1")]
        pub user: String,
        #[prost(string, tag = "2")]
        pub relation: String,
        #[prost(string, tag = "3")]
        pub object: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteRequest {
        #[prost(string, tag = "1")]
        pub store_id: String,
        #[prost(message, optional, tag = "2")]
        pub writes: Option<WriteRequestWrites>,
        #[prost(message, optional, tag = "3")]
        pub deletes: Option<WriteRequestDeletes>,
        #[prost(string, tag = "4")]
        pub authorization_model_id: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteRequestWrites {
        #[prost(message, repeated, tag = "1")]
        pub tuple_keys: Vec<TupleKey>,
        #[prost(enumeration = "OnDuplicateWriteSemantics", tag = "2")]
        pub on_duplicate: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteRequestDeletes {
        #[prost(message, repeated, tag = "1")]
        pub tuple_keys: Vec<TupleKeyWithoutCondition>,
        #[prost(enumeration = "OnMissingDeleteSemantics", tag = "2")]
        pub on_missing: i32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum OnDuplicateWriteSemantics {
        Unspecified = 0,
        Error = 1,
        Ignore = 2,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum OnMissingDeleteSemantics {
        Unspecified = 0,
        Error = 1,
        Ignore = 2,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteResponse {}

    // Checks
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CheckRequest {
        #[prost(string, tag = "1")]
        pub store_id: String,
        #[prost(message, optional, tag = "2")]
        pub tuple_key: Option<CheckRequestTupleKey>,
        #[prost(string, tag = "4")]
        pub authorization_model_id: String,
        #[prost(bool, tag = "5")]
        pub trace: bool,
        #[prost(message, optional, tag = "6")]
        pub context: Option<::prost_types::Struct>,
        #[prost(enumeration = "ConsistencyPreference", tag = "7")]
        pub consistency: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CheckRequestTupleKey {
        #[prost(string, tag = "1")]
        pub user: String,
        #[prost(string, tag = "2")]
        pub relation: String,
        #[prost(string, tag = "3")]
        pub object: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CheckResponse {
        #[prost(bool, tag = "1")]
        pub allowed: bool,
        #[prost(string, tag = "2")]
        pub resolution: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ConsistencyPreference {
        Unspecified = 0,
        MinimizeLatency = 100,
        HigherConsistency = 200,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchCheckRequest {
        #[prost(string, tag = "1")]
        pub store_id: String,
        #[prost(message, repeated, tag = "2")]
        pub checks: Vec<BatchCheckItem>,
        #[prost(string, tag = "3")]
        pub authorization_model_id: String,
        #[prost(enumeration = "ConsistencyPreference", tag = "4")]
        pub consistency: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchCheckItem {
        #[prost(message, optional, tag = "1")]
        pub tuple_key: Option<CheckRequestTupleKey>,
        #[prost(message, optional, tag = "3")]
        pub context: Option<::prost_types::Struct>,
        #[prost(string, tag = "4")]
        pub correlation_id: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchCheckResponse {
        #[prost(map = "string, message", tag = "1")]
        pub result: ::std::collections::HashMap<String, BatchCheckSingleResult>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BatchCheckSingleResult {
        #[prost(oneof = "batch_check_single_result::CheckResult", tags = "1, 2")]
        pub check_result: Option<batch_check_single_result::CheckResult>,
    }

    pub mod batch_check_single_result {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum CheckResult {
            #[prost(bool, tag = "1")]
            Allowed(bool),
            #[prost(message, tag = "2")]
            Error(super::CheckError),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CheckError {
        #[prost(string, tag = "3")]
        pub message: String,
    }

    /// OpenFGA service client
    pub mod open_fga_service_client {
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct OpenFgaServiceClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl OpenFgaServiceClient<tonic::transport::Channel> {
            pub fn new(channel: tonic::transport::Channel) -> Self {
                let inner = tonic::client::Grpc::new(channel);
                Self { inner }
            }
        }

        impl<T> OpenFgaServiceClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
        {
            pub async fn create_store(
                &mut self,
                request: impl tonic::IntoRequest<super::CreateStoreRequest>,
            ) -> std::result::Result<tonic::Response<super::CreateStoreResponse>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/openfga.v1.OpenFGAService/CreateStore",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn write_authorization_model(
                &mut self,
                request: impl tonic::IntoRequest<super::WriteAuthorizationModelRequest>,
            ) -> std::result::Result<
                tonic::Response<super::WriteAuthorizationModelResponse>,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/openfga.v1.OpenFGAService/WriteAuthorizationModel",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn read_authorization_models(
                &mut self,
                request: impl tonic::IntoRequest<super::ReadAuthorizationModelsRequest>,
            ) -> std::result::Result<
                tonic::Response<super::ReadAuthorizationModelsResponse>,
                tonic::Status,
            > {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/openfga.v1.OpenFGAService/ReadAuthorizationModels",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn write(
                &mut self,
                request: impl tonic::IntoRequest<super::WriteRequest>,
            ) -> std::result::Result<tonic::Response<super::WriteResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path =
                    http::uri::PathAndQuery::from_static("/openfga.v1.OpenFGAService/Write");
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn check(
                &mut self,
                request: impl tonic::IntoRequest<super::CheckRequest>,
            ) -> std::result::Result<tonic::Response<super::CheckResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path =
                    http::uri::PathAndQuery::from_static("/openfga.v1.OpenFGAService/Check");
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn batch_check(
                &mut self,
                request: impl tonic::IntoRequest<super::BatchCheckRequest>,
            ) -> std::result::Result<tonic::Response<super::BatchCheckResponse>, tonic::Status>
            {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/openfga.v1.OpenFGAService/BatchCheck",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }
        }
    }
}
