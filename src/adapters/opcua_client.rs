//! OPC-UA 会话适配器（真实协议栈）。
//!
//! 诊断工具面向本地网关，按原工具约定走匿名身份 + SecurityPolicy None；
//! 所有 StatusCode 失败映射进端口层的 `SessionError` 分类。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use opcua::client::prelude::*;
use opcua::sync::RwLock;

use crate::ports::session::{SessionError, TypedValue, UaNode, UaSession};

pub struct OpcUaSession {
    session: Arc<RwLock<Session>>,
    disconnected: AtomicBool,
    // Client 持有端点/证书配置，和会话同生命周期
    _client: Client,
}

impl OpcUaSession {
    /// 建立到端点的匿名会话；握手/网络失败返回 `Connection`。
    pub fn connect(endpoint_url: &str) -> Result<Self, SessionError> {
        let mut client = ClientBuilder::new()
            .application_name("opcua-diag")
            .application_uri("urn:opcua-diag")
            .product_uri("urn:opcua-diag")
            .trust_server_certs(true)
            .create_sample_keypair(true)
            .session_retry_limit(3)
            .client()
            .ok_or_else(|| SessionError::Connection {
                message: "invalid client configuration".to_string(),
            })?;

        let endpoint: EndpointDescription = (
            endpoint_url,
            SecurityPolicy::None.to_str(),
            MessageSecurityMode::None,
            UserTokenPolicy::anonymous(),
        )
            .into();

        debug!("connecting to {endpoint_url}");
        let session = client
            .connect_to_endpoint(endpoint, IdentityToken::Anonymous)
            .map_err(|status| SessionError::Connection {
                message: format!("{endpoint_url}: {status}"),
            })?;

        Ok(Self {
            session,
            disconnected: AtomicBool::new(false),
            _client: client,
        })
    }

    fn node(&self, node_id: NodeId) -> OpcUaNode {
        OpcUaNode {
            session: Arc::clone(&self.session),
            node_id,
        }
    }

    fn close(&self) {
        // 只断开一次；显式 disconnect 和 Drop 兜底共用这里
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            debug!("disconnecting session");
            self.session.write().disconnect();
        }
    }
}

impl UaSession for OpcUaSession {
    type Node = OpcUaNode;

    fn root_node(&self) -> Result<OpcUaNode, SessionError> {
        Ok(self.node(ObjectId::RootFolder.into()))
    }

    fn objects_node(&self) -> Result<OpcUaNode, SessionError> {
        Ok(self.node(ObjectId::ObjectsFolder.into()))
    }

    fn disconnect(&self) {
        self.close();
    }
}

impl Drop for OpcUaSession {
    // 任何退出路径（含错误传播）都保证释放会话
    fn drop(&mut self) {
        self.close();
    }
}

pub struct OpcUaNode {
    session: Arc<RwLock<Session>>,
    node_id: NodeId,
}

impl OpcUaNode {
    fn read_attribute(&self, attribute_id: AttributeId) -> Result<Variant, SessionError> {
        let read = ReadValueId {
            node_id: self.node_id.clone(),
            attribute_id: attribute_id as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };

        let session = self.session.read();
        let mut results = session
            .read(&[read], TimestampsToReturn::Neither, 0.0)
            .map_err(|status| SessionError::Read {
                message: format!("{}: {status}", self.node_id),
            })?;

        let data_value = results.pop().ok_or_else(|| SessionError::Read {
            message: format!("{}: empty read response", self.node_id),
        })?;
        if let Some(status) = data_value.status {
            if !status.is_good() {
                return Err(SessionError::Read {
                    message: format!("{}: {status}", self.node_id),
                });
            }
        }
        data_value.value.ok_or_else(|| SessionError::Read {
            message: format!("{}: null value", self.node_id),
        })
    }
}

impl UaNode for OpcUaNode {
    fn node_id(&self) -> String {
        self.node_id.to_string()
    }

    fn browse_name(&self) -> Result<String, SessionError> {
        match self.read_attribute(AttributeId::BrowseName)? {
            Variant::QualifiedName(name) => {
                Ok(format!("{}:{}", name.namespace_index, name.name))
            }
            other => Err(SessionError::Read {
                message: format!("{}: unexpected browse name {other:?}", self.node_id),
            }),
        }
    }

    fn display_name(&self) -> Result<String, SessionError> {
        match self.read_attribute(AttributeId::DisplayName)? {
            Variant::LocalizedText(text) => Ok(text.text.to_string()),
            other => Err(SessionError::Read {
                message: format!("{}: unexpected display name {other:?}", self.node_id),
            }),
        }
    }

    fn child(&self, path: &str) -> Result<OpcUaNode, SessionError> {
        let mut elements = Vec::new();
        for segment in path.split('/') {
            elements.push(RelativePathElement {
                reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
                is_inverse: false,
                include_subtypes: true,
                target_name: parse_qualified_name(segment)?,
            });
        }
        let browse_path = BrowsePath {
            starting_node: self.node_id.clone(),
            relative_path: RelativePath {
                elements: Some(elements),
            },
        };

        let session = self.session.read();
        let results = session
            .translate_browse_paths_to_node_ids(&[browse_path])
            .map_err(|status| SessionError::NotFound {
                path: format!("{path}: {status}"),
            })?;

        let result = results.into_iter().next().ok_or_else(|| SessionError::NotFound {
            path: path.to_string(),
        })?;
        if !result.status_code.is_good() {
            return Err(SessionError::NotFound {
                path: format!("{path}: {}", result.status_code),
            });
        }
        let target = result
            .targets
            .and_then(|targets| targets.into_iter().next())
            .ok_or_else(|| SessionError::NotFound {
                path: path.to_string(),
            })?;

        Ok(OpcUaNode {
            session: Arc::clone(&self.session),
            node_id: target.target_id.node_id,
        })
    }

    fn children(&self) -> Result<Vec<OpcUaNode>, SessionError> {
        let description = BrowseDescription {
            node_id: self.node_id.clone(),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: 0x3f,
        };

        let session = self.session.read();
        let browse_err = |status: StatusCode| SessionError::Read {
            message: format!("{}: {status}", self.node_id),
        };

        let mut result = first_browse_result(session.browse(&[description]).map_err(browse_err)?)
            .ok_or_else(|| SessionError::Read {
                message: format!("{}: empty browse response", self.node_id),
            })?;
        if !result.status_code.is_good() {
            return Err(browse_err(result.status_code));
        }

        let mut children = Vec::new();
        loop {
            if let Some(references) = result.references.take() {
                for reference in references {
                    children.push(OpcUaNode {
                        session: Arc::clone(&self.session),
                        node_id: reference.node_id.node_id,
                    });
                }
            }
            if result.continuation_point.is_null() {
                break;
            }
            let next = session
                .browse_next(false, &[result.continuation_point.clone()])
                .map_err(browse_err)?;
            result = match first_browse_result(next) {
                Some(r) => r,
                None => break,
            };
        }
        Ok(children)
    }

    fn read_value(&self) -> Result<TypedValue, SessionError> {
        let variant = self.read_attribute(AttributeId::Value)?;
        variant_to_typed(&variant).ok_or_else(|| SessionError::Read {
            message: format!("{}: unsupported value type {variant:?}", self.node_id),
        })
    }

    fn write_value(&self, value: TypedValue) -> Result<(), SessionError> {
        let variant = match value {
            TypedValue::Boolean(v) => Variant::Boolean(v),
            TypedValue::Int32(v) => Variant::Int32(v),
            TypedValue::Float(v) => Variant::Float(v),
            TypedValue::Double(v) => Variant::Double(v),
        };
        let write = WriteValue {
            node_id: self.node_id.clone(),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            value: DataValue::value_only(variant),
        };

        let session = self.session.read();
        let results = session
            .write(&[write])
            .map_err(|status| SessionError::Write {
                message: format!("{}: {status}", self.node_id),
            })?;
        if let Some(status) = results.first() {
            if !status.is_good() {
                warn!("write to {} rejected: {status}", self.node_id);
                return Err(SessionError::Write {
                    message: format!("{}: {status}", self.node_id),
                });
            }
        }
        Ok(())
    }
}

fn first_browse_result(results: Option<Vec<BrowseResult>>) -> Option<BrowseResult> {
    results.and_then(|mut r| {
        if r.is_empty() {
            None
        } else {
            Some(r.remove(0))
        }
    })
}

fn variant_to_typed(variant: &Variant) -> Option<TypedValue> {
    match variant {
        Variant::Boolean(v) => Some(TypedValue::Boolean(*v)),
        Variant::SByte(v) => Some(TypedValue::Int32(i32::from(*v))),
        Variant::Byte(v) => Some(TypedValue::Int32(i32::from(*v))),
        Variant::Int16(v) => Some(TypedValue::Int32(i32::from(*v))),
        Variant::UInt16(v) => Some(TypedValue::Int32(i32::from(*v))),
        Variant::Int32(v) => Some(TypedValue::Int32(*v)),
        Variant::UInt32(v) => Some(TypedValue::Double(f64::from(*v))),
        Variant::Int64(v) => Some(TypedValue::Double(*v as f64)),
        Variant::UInt64(v) => Some(TypedValue::Double(*v as f64)),
        Variant::Float(v) => Some(TypedValue::Float(*v)),
        Variant::Double(v) => Some(TypedValue::Double(*v)),
        _ => None,
    }
}

fn parse_qualified_name(segment: &str) -> Result<QualifiedName, SessionError> {
    match segment.split_once(':') {
        Some((namespace, name)) => {
            let namespace = namespace
                .parse::<u16>()
                .map_err(|_| SessionError::NotFound {
                    path: segment.to_string(),
                })?;
            Ok(QualifiedName::new(namespace, name))
        }
        None => Ok(QualifiedName::new(0, segment)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_segment_with_namespace() {
        let name = parse_qualified_name("1:SetHH").unwrap();
        assert_eq!(name.namespace_index, 1);
        assert_eq!(name.name.as_ref(), "SetHH");
    }

    #[test]
    fn qualified_name_segment_defaults_to_namespace_zero() {
        let name = parse_qualified_name("Objects").unwrap();
        assert_eq!(name.namespace_index, 0);
    }

    #[test]
    fn qualified_name_rejects_bad_namespace() {
        assert!(parse_qualified_name("x:SetHH").is_err());
    }

    #[test]
    fn numeric_variants_map_into_typed_values() {
        assert_eq!(
            variant_to_typed(&Variant::Float(1.5)),
            Some(TypedValue::Float(1.5))
        );
        assert_eq!(
            variant_to_typed(&Variant::UInt16(7)),
            Some(TypedValue::Int32(7))
        );
        assert_eq!(variant_to_typed(&Variant::String("x".into())), None);
    }
}
