//! Repository layer: a resource plus an entity mapper over one collection.
//!
//! # Design
//! Server payloads and local entities often disagree only on field names
//! (`created_at` vs `createdAt`, `id` vs `uuid`). `KeyMap` renames top-level
//! keys in both directions and lets serde handle the rest of the shape.
//! `Repository` delegates the whole `Resource` surface to its inner resource
//! and implements `EntityResource` by listing the collection.

use std::fmt::Display;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::fetch::FetchResource;
use crate::http::UreqTransport;
use crate::options::{CallOptions, RequestOptions};
use crate::resource::{EntityResource, Resource};
use crate::response::{Envelope, STATUS_FIELD};

/// Converts between wire payloads and entities.
pub trait EntityMapper<E> {
    fn to_entity(&self, payload: Value) -> Result<E, ResourceError>;
    fn to_payload(&self, entity: &E) -> Result<Value, ResourceError>;
}

/// Renames top-level keys between remote and local names, then uses serde.
///
/// An empty map is the identity mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    /// (remote, local) pairs
    pairs: Vec<(String, String)>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, remote: impl Into<String>, local: impl Into<String>) -> Self {
        self.pairs.push((remote.into(), local.into()));
        self
    }

    fn to_local(&self, mut map: Map<String, Value>) -> Map<String, Value> {
        map.remove(STATUS_FIELD);
        rename_keys(map, self.pairs.iter().map(|(r, l)| (r.as_str(), l.as_str())))
    }

    fn to_remote(&self, map: Map<String, Value>) -> Map<String, Value> {
        rename_keys(map, self.pairs.iter().map(|(r, l)| (l.as_str(), r.as_str())))
    }
}

fn rename_keys<'a>(
    map: Map<String, Value>,
    pairs: impl Iterator<Item = (&'a str, &'a str)> + Clone,
) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let renamed = pairs
                .clone()
                .find(|(from, _)| *from == key)
                .map(|(_, to)| to.to_string())
                .unwrap_or(key);
            (renamed, value)
        })
        .collect()
}

impl<E> EntityMapper<E> for KeyMap
where
    E: Serialize + DeserializeOwned,
{
    fn to_entity(&self, payload: Value) -> Result<E, ResourceError> {
        let payload = match payload {
            Value::Object(map) => Value::Object(self.to_local(map)),
            other => other,
        };
        Ok(serde_json::from_value(payload)?)
    }

    fn to_payload(&self, entity: &E) -> Result<Value, ResourceError> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(Value::Object(self.to_remote(map))),
            other => Ok(other),
        }
    }
}

/// Entity-level access to one REST collection.
#[derive(Debug, Clone)]
pub struct Repository<R, M, E> {
    resource: R,
    mapper: M,
    collection: String,
    _entity: PhantomData<fn() -> E>,
}

impl<R, M, E> Repository<R, M, E>
where
    R: Resource,
    M: EntityMapper<E>,
{
    pub fn new(resource: R, mapper: M, collection: impl Into<String>) -> Self {
        Self {
            resource,
            mapper,
            collection: collection.into(),
            _entity: PhantomData,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn item_path(&self, id: &dyn Display) -> String {
        format!("{}/{id}", self.collection)
    }

    /// List the collection. The response must be a JSON array.
    pub fn find_all(&self, options: Option<&CallOptions>) -> Result<Vec<E>, ResourceError> {
        let envelope = self.resource.get(&self.collection, None, options)?;
        match envelope.into_value() {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.mapper.to_entity(item))
                .collect(),
            other => Err(ResourceError::Decode(serde::de::Error::custom(format!(
                "expected a JSON array listing `{}`, got {other}",
                self.collection
            )))),
        }
    }

    pub fn find(&self, id: &dyn Display) -> Result<E, ResourceError> {
        let envelope = self.resource.get(&self.item_path(id), None, None)?;
        self.mapper.to_entity(envelope.into_value())
    }

    pub fn create(&self, entity: &E) -> Result<E, ResourceError> {
        let payload = self.mapper.to_payload(entity)?;
        let envelope = self.resource.post(&self.collection, Some(&payload), None)?;
        self.mapper.to_entity(envelope.into_value())
    }

    /// Replace an entity.
    pub fn update(&self, id: &dyn Display, entity: &E) -> Result<E, ResourceError> {
        let payload = self.mapper.to_payload(entity)?;
        let envelope = self.resource.put(&self.item_path(id), Some(&payload), None)?;
        self.mapper.to_entity(envelope.into_value())
    }

    /// Send a partial update. `changes` uses local field names.
    pub fn patch(&self, id: &dyn Display, changes: &E) -> Result<E, ResourceError> {
        let payload = self.mapper.to_payload(changes)?;
        let envelope = self.resource.patch(&self.item_path(id), Some(&payload), None)?;
        self.mapper.to_entity(envelope.into_value())
    }

    pub fn remove(&self, id: &dyn Display) -> Result<Envelope, ResourceError> {
        self.resource.delete(&self.item_path(id), None, None)
    }
}

impl<R, M, E> Resource for Repository<R, M, E>
where
    R: Resource,
    M: EntityMapper<E>,
{
    fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.resource.post(path, body, options)
    }

    fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.resource.put(path, body, options)
    }

    fn patch(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.resource.patch(path, body, options)
    }

    fn get(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.resource.get(path, body, options)
    }

    fn delete(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.resource.delete(path, body, options)
    }

    fn set_headers(&mut self, headers: &[(&str, &str)]) {
        self.resource.set_headers(headers);
    }

    fn clear_headers(&mut self) {
        self.resource.clear_headers();
    }

    fn set_base_path(&mut self, base_path: &str) {
        self.resource.set_base_path(base_path);
    }

    fn resolve_destination(&self, segments: &[&dyn Display]) -> String {
        self.resource.resolve_destination(segments)
    }

    fn query_string(&self, params: &Map<String, Value>) -> String {
        self.resource.query_string(params)
    }
}

impl<R, M, E> EntityResource for Repository<R, M, E>
where
    R: Resource,
    M: EntityMapper<E>,
{
    type Entity = E;

    fn get_all_entities(&self, options: Option<&CallOptions>) -> Result<Vec<E>, ResourceError> {
        self.find_all(options)
    }
}

/// Builder for a `Repository` over a `FetchResource`.
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    options: RequestOptions,
    collection: String,
    keys: KeyMap,
}

impl RepositoryBuilder {
    pub fn new(base_path: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            options: RequestOptions::new(base_path),
            collection: collection.into(),
            keys: KeyMap::new(),
        }
    }

    /// Replace the request defaults, keeping the base path already given
    /// unless `options` carries its own.
    pub fn options(mut self, options: RequestOptions) -> Self {
        let base_path = options.base_path.clone().or(self.options.base_path.take());
        self.options = RequestOptions { base_path, ..options };
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.with_header(name, value);
        self
    }

    pub fn rename(mut self, remote: impl Into<String>, local: impl Into<String>) -> Self {
        self.keys = self.keys.rename(remote, local);
        self
    }

    pub fn build<E>(self) -> Repository<FetchResource<UreqTransport>, KeyMap, E>
    where
        E: Serialize + DeserializeOwned,
    {
        Repository::new(FetchResource::new(self.options), self.keys, self.collection)
    }
}

/// Repository for `collection` under `base_path` with default options.
pub fn repository<E>(
    base_path: impl Into<String>,
    collection: impl Into<String>,
) -> Repository<FetchResource<UreqTransport>, KeyMap, E>
where
    E: Serialize + DeserializeOwned,
{
    RepositoryBuilder::new(base_path, collection).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        display_name: String,
    }

    fn keys() -> KeyMap {
        KeyMap::new().rename("name", "display_name")
    }

    type Script<'a> = dyn Fn(&HttpRequest) -> Result<HttpResponse, ResourceError> + 'a;
    type Scripted<'a> = FetchResource<Box<Script<'a>>>;

    fn scripted<'a>(
        log: &'a RefCell<Vec<HttpRequest>>,
        status: u16,
        body: &'a str,
    ) -> Scripted<'a> {
        let transport: Box<Script<'a>> = Box::new(move |req: &HttpRequest| {
            log.borrow_mut().push(req.clone());
            Ok(HttpResponse {
                status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: body.to_string(),
            })
        });
        FetchResource::with_transport(RequestOptions::new("http://api"), transport)
    }

    #[test]
    fn key_map_renames_both_ways() {
        let user: User = keys()
            .to_entity(json!({"id": 1, "name": "Ann", "_status": 200}))
            .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                display_name: "Ann".to_string()
            }
        );
        let payload = EntityMapper::<User>::to_payload(&keys(), &user).unwrap();
        assert_eq!(payload, json!({"id": 1, "name": "Ann"}));
    }

    #[test]
    fn empty_key_map_is_identity() {
        let value = json!({"id": 2, "display_name": "Bo"});
        let user: User = KeyMap::new().to_entity(value.clone()).unwrap();
        assert_eq!(EntityMapper::<User>::to_payload(&KeyMap::new(), &user).unwrap(), value);
    }

    #[test]
    fn find_all_maps_every_item() {
        let log = RefCell::new(Vec::new());
        let repo: Repository<_, _, User> = Repository::new(
            scripted(&log, 200, r#"[{"id":1,"name":"Ann"},{"id":2,"name":"Bo"}]"#),
            keys(),
            "users",
        );
        let users = repo.get_all_entities(None).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].display_name, "Bo");
        assert_eq!(log.borrow()[0].url, "http://api/users");
    }

    #[test]
    fn find_all_rejects_non_array_payloads() {
        let log = RefCell::new(Vec::new());
        let repo: Repository<_, _, User> =
            Repository::new(scripted(&log, 200, r#"{"items":[]}"#), keys(), "users");
        assert!(matches!(repo.find_all(None), Err(ResourceError::Decode(_))));
    }

    #[test]
    fn create_sends_remote_names() {
        let log = RefCell::new(Vec::new());
        let repo = Repository::new(scripted(&log, 201, r#"{"id":5,"name":"Cy"}"#), keys(), "users");
        let created = repo
            .create(&User {
                id: 0,
                display_name: "Cy".to_string(),
            })
            .unwrap();
        assert_eq!(created.id, 5);

        let log = log.borrow();
        let sent = &log[0];
        assert_eq!(sent.method, HttpMethod::Post);
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"id": 0, "name": "Cy"}));
    }

    #[test]
    fn item_operations_target_item_path() {
        let log = RefCell::new(Vec::new());
        let repo: Repository<_, _, User> =
            Repository::new(scripted(&log, 200, r#"{"id":5,"name":"Di"}"#), keys(), "users");
        let user = repo.find(&5).unwrap();
        repo.update(&5, &user).unwrap();
        repo.patch(&5, &user).unwrap();
        repo.remove(&5).unwrap();

        let log = log.borrow();
        let calls: Vec<(HttpMethod, &str)> =
            log.iter().map(|r| (r.method, r.url.as_str())).collect();
        assert_eq!(
            calls,
            vec![
                (HttpMethod::Get, "http://api/users/5"),
                (HttpMethod::Put, "http://api/users/5"),
                (HttpMethod::Patch, "http://api/users/5"),
                (HttpMethod::Delete, "http://api/users/5"),
            ]
        );
    }

    #[test]
    fn http_failures_surface_from_repository() {
        let log = RefCell::new(Vec::new());
        let repo: Repository<_, _, User> =
            Repository::new(scripted(&log, 404, r#"{"error":"missing"}"#), keys(), "users");
        let err = repo.find(&"nope").unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn repository_delegates_configuration() {
        let log = RefCell::new(Vec::new());
        let mut repo: Repository<_, _, User> =
            Repository::new(scripted(&log, 200, "[]"), keys(), "users");
        repo.set_base_path("http://other/");
        repo.set_headers(&[("X-Key", "k")]);
        repo.find_all(None).unwrap();
        assert_eq!(log.borrow()[0].url, "http://other/users");
        assert_eq!(log.borrow()[0].header("x-key"), Some("k"));
        assert_eq!(repo.resolve_destination(&[&"users", &1]), "http://other/users/1");
    }

    #[test]
    fn builder_keeps_base_path_and_headers() {
        let repo = RepositoryBuilder::new("http://api", "users")
            .options(RequestOptions::default().with_trailing_slash(true))
            .header("Accept", "application/json")
            .rename("name", "display_name")
            .build::<User>();
        let options = repo.resource().options();
        assert_eq!(options.base_path.as_deref(), Some("http://api"));
        assert!(options.trailing_slash);
        assert_eq!(options.headers.len(), 1);
        assert_eq!(repo.collection(), "users");
    }

    #[test]
    fn factory_uses_defaults() {
        let repo = repository::<User>("http://api/", "users");
        assert_eq!(repo.resource().options().base_path.as_deref(), Some("http://api/"));
        assert_eq!(repo.resolve_destination(&[&repo.collection(), &3]), "http://api/users/3");
    }
}
