use std::sync::{Arc, Mutex};

use tether::http::request::{Method, Request, RequestBuilder};
use tether::http::response::{RouteError, StatusCode};
use tether::http::writer::ResponseWriter;
use tether::server::{BoxHandler, MiddlewareChain, handler_fn};

type Log = Arc<Mutex<Vec<String>>>;

fn recording(name: &'static str, log: Log) -> impl Fn(BoxHandler) -> BoxHandler + Send + Sync {
    move |next: BoxHandler| {
        let log = log.clone();
        handler_fn(move |w, r| {
            log.lock().unwrap().push(format!("{name}-before"));
            let res = next.call(w, r);
            log.lock().unwrap().push(format!("{name}-after"));
            res
        })
    }
}

fn request() -> Request {
    RequestBuilder::new().method(Method::GET).path("/").build().unwrap()
}

#[test]
fn test_first_registered_runs_outermost() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut chain = MiddlewareChain::new();
    chain.use_middleware(recording("M1", log.clone()));
    chain.use_middleware(recording("M2", log.clone()));

    let inner_log = log.clone();
    let handler = chain.apply(handler_fn(move |w, _r| {
        inner_log.lock().unwrap().push("H".to_string());
        w.send_response(b"done")
    }));

    let req = request();
    let mut w = ResponseWriter::new(req.version, true, None);
    handler.call(&mut w, &req).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["M1-before", "M2-before", "H", "M2-after", "M1-after"]
    );
}

#[test]
fn test_empty_chain_returns_handler() {
    let chain = MiddlewareChain::new();
    let handler = chain.apply(handler_fn(|w, _r| w.send_response(b"plain")));

    let req = request();
    let mut w = ResponseWriter::new(req.version, true, None);
    handler.call(&mut w, &req).unwrap();

    assert!(chain.is_empty());
    assert!(w.as_bytes().ends_with(b"plain"));
}

#[test]
fn test_middleware_can_short_circuit() {
    let reached = Arc::new(Mutex::new(false));
    let mut chain = MiddlewareChain::new();
    chain.use_middleware(|_next: BoxHandler| -> BoxHandler {
        handler_fn(|_w, _r| Err(RouteError::new(StatusCode::Forbidden, "blocked")))
    });

    let flag = reached.clone();
    let handler = chain.apply(handler_fn(move |_w, _r| {
        *flag.lock().unwrap() = true;
        Ok(())
    }));

    let req = request();
    let mut w = ResponseWriter::new(req.version, true, None);
    let err = handler.call(&mut w, &req).unwrap_err();

    assert_eq!(err.code, StatusCode::Forbidden);
    assert!(!*reached.lock().unwrap());
}

#[test]
fn test_chain_applies_fresh_per_handler() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut chain = MiddlewareChain::new();
    chain.use_middleware(recording("M", log.clone()));

    let a = chain.apply(handler_fn(|w, _r| w.send_response(b"a")));
    let b = chain.apply(handler_fn(|w, _r| w.send_response(b"b")));

    let req = request();
    let mut wa = ResponseWriter::new(req.version, true, None);
    let mut wb = ResponseWriter::new(req.version, true, None);
    a.call(&mut wa, &req).unwrap();
    b.call(&mut wb, &req).unwrap();

    assert!(wa.as_bytes().ends_with(b"a"));
    assert!(wb.as_bytes().ends_with(b"b"));
    assert_eq!(log.lock().unwrap().len(), 4);
}
