use proptest::prelude::*;

/// Strategy for generating proxy host names
pub fn proxy_host_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,6}){0,2}"
}

/// Strategy for generating `host[:port]` proxy servers with their expected port
pub fn proxy_server_strategy() -> impl Strategy<Value = (String, Option<u16>)> {
    (proxy_host_strategy(), prop::option::of(1u16..=u16::MAX))
}

/// Strategy for generating per-scheme rules entries (`http=...`, `https=...`)
pub fn scheme_entry_strategy() -> impl Strategy<Value = (String, Vec<(String, Option<u16>)>)> {
    (
        prop_oneof![Just("http".to_string()), Just("https".to_string()), Just("ftp".to_string())],
        prop::collection::vec(proxy_server_strategy(), 1..4),
    )
}

/// Render a server list as it appears in a rules string
pub fn render_servers(servers: &[(String, Option<u16>)]) -> String {
    servers
        .iter()
        .map(|(host, port)| match port {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Strategy for generating command lines: program, switches and positionals
pub fn argv_strategy() -> impl Strategy<Value = Vec<String>> {
    let arg = prop_oneof![
        "--[a-z]{1,8}(=[a-z0-9]{1,4})?",
        "[a-z0-9]{1,8}(\\.nw)?",
    ];
    prop::collection::vec(arg, 0..8).prop_map(|mut args| {
        args.insert(0, "host".to_string());
        args
    })
}

/// Strategy for `setProxyConfig` pac_url values, including the sentinels
pub fn pac_url_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("<direct>".to_string())),
        Just(Some("<auto>".to_string())),
        "[a-z]{1,10}".prop_map(|host| Some(format!("http://{host}/proxy.pac"))),
    ]
}
