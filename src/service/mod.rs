//! CrudService: generic CRUD over the registry and a storage adapter.

mod crud;
pub use crud::CrudService;
