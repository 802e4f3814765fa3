//! 会话端口接口：诊断逻辑只依赖这里的抽象，不直接接触协议栈类型。
//! 说明：实现方负责 connect/disconnect 生命周期；`disconnect` 为尽力而为，失败被吞掉。

use std::fmt;

use thiserror::Error;

/// 会话层错误分类。
/// `Connection` 对整次运行是致命的；其余错误隔离到当前节点/点位，调用方记录后继续。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("node not found: {path}")]
    NotFound { path: String },

    #[error("read error: {message}")]
    Read { message: String },

    #[error("write error: {message}")]
    Write { message: String },
}

/// 带显式线缆类型标记的值。
/// 写入必须显式指定类型（服务器端不做隐式转换，Float 点位收到 Double 会被拒绝）。
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Boolean(bool),
    Int32(i32),
    Float(f32),
    Double(f64),
}

impl TypedValue {
    /// 以单精度浮点标记构造写入值（验证表走这里）。
    pub fn float(value: f64) -> Self {
        TypedValue::Float(value as f32)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Boolean(_) => None,
            TypedValue::Int32(v) => Some(f64::from(*v)),
            TypedValue::Float(v) => Some(f64::from(*v)),
            TypedValue::Double(v) => Some(*v),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Boolean(v) => write!(f, "{v}"),
            TypedValue::Int32(v) => write!(f, "{v}"),
            // {:?} 保留小数点（200.0 而不是 200），控制台展示用
            TypedValue::Float(v) => write!(f, "{v:?}"),
            TypedValue::Double(v) => write!(f, "{v:?}"),
        }
    }
}

/// 地址空间中的一个节点句柄。
pub trait UaNode: Sized {
    /// 节点标识的展示形式（如 `ns=1;s=TT_11006.SetHH`），本地信息，不访问服务器。
    fn node_id(&self) -> String;

    /// 命名空间限定的浏览名展示形式（如 `1:SetHH`）。
    fn browse_name(&self) -> Result<String, SessionError>;

    /// 本地化显示名的文本部分。
    fn display_name(&self) -> Result<String, SessionError>;

    /// 按限定路径解析子节点；多级路径用 `/` 分隔（如 `1:TT_11006/1:SetHH`）。
    /// 任一段无法解析返回 `NotFound`。
    fn child(&self, path: &str) -> Result<Self, SessionError>;

    /// 有序、有限的直接子节点列表。
    fn children(&self) -> Result<Vec<Self>, SessionError>;

    fn read_value(&self) -> Result<TypedValue, SessionError>;

    fn write_value(&self, value: TypedValue) -> Result<(), SessionError>;
}

/// 已建立的协议会话。获取一次、结束释放一次（包括异常路径）。
pub trait UaSession {
    type Node: UaNode;

    fn root_node(&self) -> Result<Self::Node, SessionError>;

    /// 标准 Objects 容器的快捷入口。
    fn objects_node(&self) -> Result<Self::Node, SessionError>;

    /// 尽力而为断开；重复调用与失败均安全。
    fn disconnect(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_constructor_tags_single_precision() {
        let value = TypedValue::float(200.0);
        assert_eq!(value, TypedValue::Float(200.0));
        assert_eq!(value.as_f64(), Some(200.0));
    }

    #[test]
    fn display_keeps_decimal_point_for_floats() {
        assert_eq!(TypedValue::float(200.0).to_string(), "200.0");
        assert_eq!(TypedValue::Double(199.5).to_string(), "199.5");
        assert_eq!(TypedValue::Int32(7).to_string(), "7");
    }

    #[test]
    fn boolean_has_no_numeric_view() {
        assert_eq!(TypedValue::Boolean(true).as_f64(), None);
    }
}
