#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

pub use self::{
    cipher::{Secret, Token},
    guard::{CsrfExempt, CsrfGuard, Reason},
    handle::CsrfHandle,
    layer::CsrfLayer,
    referer::{is_same_domain, RefererValidator},
    service::{CsrfBody, CsrfService},
    vary::patch_vary_headers,
};

pub mod cipher;

mod guard;
mod handle;
mod layer;
mod referer;
mod service;
mod vary;
