/// Options that control how introspection behaves.
#[derive(Debug, Clone)]
pub struct IntrospectOptions {
    pub include_system_schemas: bool,
    pub include_views: bool,
    pub include_comments: bool,
    /// Restrict introspection to these namespaces.
    pub schemas: Option<Vec<String>>,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            include_system_schemas: false,
            include_views: false,
            include_comments: true,
            schemas: None,
        }
    }
}
