use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        // portal pages may be served from the captive-portal host rather than this API
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        // the session travels as a cookie
        .supports_credentials()
        .max_age(3600)
}
