//! Messages exchanged with the turtle simulator.
//!
//! Service calls go to the simulator's service port as [`ServiceRequest`] and are answered with a
//! [`ServiceResponse`] carrying the same `request_id`. Motion commands go to the motion port as
//! [`MotionPacket`] and are never answered.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnRequest {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub theta: f32,
    /// empty lets the simulator pick a name
    #[prost(string, tag = "4")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnResponse {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetPenRequest {
    #[prost(string, tag = "1")]
    pub agent: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub r: u32,
    #[prost(uint32, tag = "3")]
    pub g: u32,
    #[prost(uint32, tag = "4")]
    pub b: u32,
    #[prost(uint32, tag = "5")]
    pub width: u32,
    #[prost(bool, tag = "6")]
    pub off: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KillRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListServices {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceRequest {
    #[prost(uint32, tag = "1")]
    pub request_id: u32,
    #[prost(oneof = "service_request::Call", tags = "2, 3, 4, 5")]
    pub call: ::core::option::Option<service_request::Call>,
}

pub mod service_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Call {
        #[prost(message, tag = "2")]
        Spawn(super::SpawnRequest),
        #[prost(message, tag = "3")]
        SetPen(super::SetPenRequest),
        #[prost(message, tag = "4")]
        Kill(super::KillRequest),
        #[prost(message, tag = "5")]
        ListServices(super::ListServices),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceError {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceList {
    #[prost(string, repeated, tag = "1")]
    pub names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceResponse {
    #[prost(uint32, tag = "1")]
    pub request_id: u32,
    #[prost(oneof = "service_response::Outcome", tags = "2, 3, 4, 5")]
    pub outcome: ::core::option::Option<service_response::Outcome>,
}

pub mod service_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Outcome {
        #[prost(message, tag = "2")]
        Spawned(super::SpawnResponse),
        #[prost(message, tag = "3")]
        Ack(super::Ack),
        #[prost(message, tag = "4")]
        Error(super::ServiceError),
        #[prost(message, tag = "5")]
        Services(super::ServiceList),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Vector3 {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub z: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Twist {
    #[prost(message, optional, tag = "1")]
    pub linear: ::core::option::Option<Vector3>,
    #[prost(message, optional, tag = "2")]
    pub angular: ::core::option::Option<Vector3>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MotionPacket {
    #[prost(string, tag = "1")]
    pub agent: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub twist: ::core::option::Option<Twist>,
}
