//! 请求参数编码
//!
//! 把具名参数转换为扁平的 `name=value` 列表:
//! - 未设置的值 (`None` / [`ParamValue::Null`]) 整体省略, 不会发送空字符串
//! - 布尔值编码为 `1` / `0`
//! - 索引集合 `net = {0: "a", 3: "b"}` 展开为 `net0=a`, `net3=b`
//!
//! GET 请求时编码结果放在查询字符串中 (百分号编码),
//! 其他方法放在 `application/x-www-form-urlencoded` 请求体中。

use std::collections::{BTreeMap, HashMap};

/// 单个参数值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// 稀疏索引集合, 键不要求连续
    Indexed(BTreeMap<u32, String>),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

impl From<BTreeMap<u32, String>> for ParamValue {
    fn from(v: BTreeMap<u32, String>) -> Self {
        Self::Indexed(v)
    }
}

impl From<HashMap<u32, String>> for ParamValue {
    fn from(v: HashMap<u32, String>) -> Self {
        Self::Indexed(v.into_iter().collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// 有序参数表
///
/// # Example
/// ```
/// use pve_client::Params;
///
/// let params = Params::new()
///     .with("name", "web01")
///     .with("onboot", true)
///     .with("description", None::<String>)
///     .with_indexed("net", [(0, "virtio,bridge=vmbr0"), (2, "e1000,bridge=vmbr1")]);
///
/// assert_eq!(
///     params.encode(),
///     vec![
///         ("name".to_string(), "web01".to_string()),
///         ("onboot".to_string(), "1".to_string()),
///         ("net0".to_string(), "virtio,bridge=vmbr0".to_string()),
///         ("net2".to_string(), "e1000,bridge=vmbr1".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置参数, 同名参数会被替换
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// 添加索引参数, 例如 `net0`, `net1`
    pub fn add_indexed<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (u32, V)>,
        V: Into<String>,
    {
        let map: BTreeMap<u32, String> = values.into_iter().map(|(i, v)| (i, v.into())).collect();
        self.insert(name, ParamValue::Indexed(map));
    }

    pub fn with_indexed<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (u32, V)>,
        V: Into<String>,
    {
        self.add_indexed(name, values);
        self
    }

    /// 合并另一组参数, `other` 中的同名参数优先
    pub fn extend(&mut self, other: Params) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// 编码后是否没有任何参数
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, v)| match v {
            ParamValue::Null => true,
            ParamValue::Indexed(map) => map.is_empty(),
            _ => false,
        })
    }

    /// 展开为扁平的字符串键值对, 保持插入顺序
    pub fn encode(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            match value {
                ParamValue::Null => {}
                ParamValue::Bool(b) => {
                    out.push((name.clone(), if *b { "1" } else { "0" }.to_string()))
                }
                ParamValue::Int(i) => out.push((name.clone(), i.to_string())),
                ParamValue::Str(s) => out.push((name.clone(), s.clone())),
                ParamValue::Indexed(map) => {
                    for (index, v) in map {
                        out.push((format!("{}{}", name, index), v.clone()));
                    }
                }
            }
        }
        out
    }

    /// 百分号编码的查询字符串 (不含前导 `?`)
    pub fn to_query_string(&self) -> String {
        self.encode()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `application/x-www-form-urlencoded` 请求体
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.encode())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
